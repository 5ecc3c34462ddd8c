//! Payload stream cipher.
//!
//! ChaCha20 with the DJB 64-bit nonce layout; the container's nonce
//! counter is the nonce, so a key/counter pair is used for exactly one write.

use chacha20::ChaCha20Legacy;
use chacha20::cipher::{KeyIvInit, StreamCipher};

use super::KEY_LEN;

/// XOR the keystream for `(key, counter)` into `buf` in place.
pub fn apply_keystream(key: &[u8; KEY_LEN], counter: u64, buf: &mut [u8]) {
    let nonce = counter.to_le_bytes();
    let mut cipher = ChaCha20Legacy::new(key.into(), (&nonce).into());
    cipher.apply_keystream(buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystream_is_an_involution() {
        let key = [9u8; KEY_LEN];
        let mut buf = b"serialized entries".to_vec();

        apply_keystream(&key, 1, &mut buf);
        assert_ne!(buf, b"serialized entries");

        apply_keystream(&key, 1, &mut buf);
        assert_eq!(buf, b"serialized entries");
    }

    #[test]
    fn counter_changes_keystream() {
        let key = [9u8; KEY_LEN];
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];

        apply_keystream(&key, 1, &mut a);
        apply_keystream(&key, 2, &mut b);

        assert_ne!(a, b);
    }
}
