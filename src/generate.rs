//! Random password generation.

use zeroize::Zeroizing;

use crate::crypto::secure_random;
use crate::error::{Error, Result};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// `A-Z a-z 0-9`
    Alphanumeric,
    /// Every visible ASCII character, `!` through `~`.
    #[default]
    Printable,
}

impl Charset {
    fn alphabet(self) -> &'static [u8] {
        static PRINTABLE: [u8; 94] = {
            let mut out = [0u8; 94];
            let mut i = 0;
            while i < out.len() {
                out[i] = b'!' + i as u8;
                i += 1;
            }
            out
        };

        match self {
            Charset::Alphanumeric => ALPHANUMERIC,
            Charset::Printable => &PRINTABLE,
        }
    }
}

/// Generate a password of `length` characters drawn uniformly from
/// `charset`.
///
/// Bytes from the OS generator at or above the largest multiple of the
/// alphabet size are discarded, so no character is favoured.
pub fn generate_password(length: usize, charset: Charset) -> Result<Zeroizing<String>> {
    if length == 0 {
        return Err(Error::InvalidLength);
    }

    let alphabet = charset.alphabet();
    let limit = 256 - 256 % alphabet.len();

    let mut password = Zeroizing::new(String::with_capacity(length));
    let mut pool = Zeroizing::new([0u8; 64]);

    while password.len() < length {
        secure_random(pool.as_mut())?;
        for &b in pool.iter() {
            if usize::from(b) < limit {
                password.push(char::from(alphabet[usize::from(b) % alphabet.len()]));
                if password.len() == length {
                    break;
                }
            }
        }
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        for len in [1, 16, 64, 200] {
            assert_eq!(generate_password(len, Charset::Printable).unwrap().len(), len);
        }
    }

    #[test]
    fn alphanumeric_stays_in_charset() {
        let pw = generate_password(500, Charset::Alphanumeric).unwrap();
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn printable_stays_in_charset() {
        let pw = generate_password(500, Charset::Printable).unwrap();
        assert!(pw.chars().all(|c| c.is_ascii_graphic()));
    }

    #[test]
    fn printable_alphabet_is_complete() {
        let alphabet = Charset::Printable.alphabet();
        assert_eq!(alphabet.first(), Some(&b'!'));
        assert_eq!(alphabet.last(), Some(&b'~'));
        assert!(alphabet.iter().all(u8::is_ascii_graphic));
    }

    #[test]
    fn zero_length_is_rejected() {
        assert!(matches!(
            generate_password(0, Charset::Alphanumeric),
            Err(Error::InvalidLength)
        ));
    }

    #[test]
    fn passwords_differ() {
        let a = generate_password(32, Charset::Printable).unwrap();
        let b = generate_password(32, Charset::Printable).unwrap();
        assert_ne!(a, b);
    }
}
