//! A single credential record and its codec.
//!
//! Record layout, integers big-endian:
//! ```text
//! NAME_LEN (4) | PLAIN_LEN (4) | IV (16) | NAME (NAME_LEN) | BLOB (PLAIN_LEN rounded up to 16)
//! ```
//!
//! The blob is the secret zero-padded to the AES block size and encrypted
//! with AES-256-CBC under the container's entry key. There is no per-entry
//! integrity check; the container MAC covers every record.

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{self, BLOCK_LEN, IV_LEN, KEY_LEN};
use crate::error::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const LEN_FIELD: usize = 4;
const FIXED_LEN: usize = 2 * LEN_FIELD + IV_LEN;

/// Length of the encrypted blob for a secret of `plain_len` bytes.
pub fn padded_len(plain_len: usize) -> usize {
    plain_len.div_ceil(BLOCK_LEN) * BLOCK_LEN
}

#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Entry {
    name: String,
    plain_len: u32,
    iv: [u8; IV_LEN],
    blob: Vec<u8>,
}

impl Entry {
    /// Encrypt `plaintext` under `key` with a fresh IV.
    pub fn create(name: &str, plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        if u32::try_from(name.len()).is_err() {
            return Err(Error::TooLong("entry name"));
        }
        if plaintext.is_empty() {
            return Err(Error::EmptySecret);
        }
        let plain_len = u32::try_from(plaintext.len()).map_err(|_| Error::TooLong("secret"))?;

        let iv = crypto::generate_iv()?;
        let len = padded_len(plaintext.len());

        let mut buf = Zeroizing::new(vec![0u8; len]);
        buf[..plaintext.len()].copy_from_slice(plaintext);
        Aes256CbcEnc::new(key.into(), (&iv).into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|_| Error::InvalidFormat)?;
        let blob = std::mem::take(&mut *buf);

        Ok(Self {
            name: name.to_owned(),
            plain_len,
            iv,
            blob,
        })
    }

    /// Decrypt the secret. The returned buffer is wiped when dropped.
    pub fn reveal(&self, key: &[u8; KEY_LEN]) -> Result<Zeroizing<Vec<u8>>> {
        let plain_len = self.plain_len as usize;
        if self.blob.len() != padded_len(plain_len) {
            return Err(Error::InvalidFormat);
        }

        let mut buf = Zeroizing::new(self.blob.clone());
        Aes256CbcDec::new(key.into(), (&self.iv).into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|_| Error::InvalidFormat)?;
        // drop the zero padding, scrubbing it first
        buf[plain_len..].zeroize();
        buf.truncate(plain_len);

        Ok(buf)
    }

    /// Wipe and release the record.
    pub fn destroy(mut self) {
        self.zeroize();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plain_len(&self) -> usize {
        self.plain_len as usize
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Number of bytes [`Entry::encode`] produces.
    pub fn serial_size(&self) -> usize {
        FIXED_LEN + self.name.len() + self.blob.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serial_size());
        self.encode_into(&mut buf);
        buf
    }

    /// Append the record to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        // lengths were checked against u32 in create/decode
        buf.extend_from_slice(&(self.name.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.plain_len.to_be_bytes());
        buf.extend_from_slice(&self.iv);
        buf.extend_from_slice(self.name.as_bytes());
        buf.extend_from_slice(&self.blob);
    }

    #[cfg(test)]
    pub(crate) fn with_short_blob(mut self) -> Self {
        self.blob.truncate(self.blob.len() - BLOCK_LEN);
        self
    }

    /// Decode exactly one record.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = data;
        let entry = Self::decode_from(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::InvalidFormat);
        }
        Ok(entry)
    }

    /// Decode one record from the front of `cursor` and advance past it.
    pub fn decode_from(cursor: &mut &[u8]) -> Result<Self> {
        let name_len = take_u32(cursor)? as usize;
        let plain_len = take_u32(cursor)?;
        if plain_len == 0 {
            return Err(Error::EmptySecret);
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(take(cursor, IV_LEN)?);

        let name = std::str::from_utf8(take(cursor, name_len)?)
            .map_err(|_| Error::InvalidFormat)?
            .to_owned();
        let blob = take(cursor, padded_len(plain_len as usize))?.to_vec();

        Ok(Self {
            name,
            plain_len,
            iv,
            blob,
        })
    }
}

fn take<'a>(cursor: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if cursor.len() < len {
        return Err(Error::Truncated);
    }
    let (head, tail) = cursor.split_at(len);
    *cursor = tail;
    Ok(head)
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32> {
    let mut raw = [0u8; LEN_FIELD];
    raw.copy_from_slice(take(cursor, LEN_FIELD)?);
    Ok(u32::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [0x42; KEY_LEN];

    #[test]
    fn create_and_reveal_roundtrip() {
        let entry = Entry::create("email", b"p@ss1", &KEY).unwrap();

        assert_eq!(entry.name(), "email");
        assert_eq!(entry.plain_len(), 5);
        assert_eq!(entry.blob().len(), 16);
        assert_eq!(&**entry.reveal(&KEY).unwrap(), b"p@ss1");
    }

    #[test]
    fn blob_is_not_plaintext() {
        let entry = Entry::create("a", b"sixteen byte pw!", &KEY).unwrap();
        assert_ne!(entry.blob(), b"sixteen byte pw!");
    }

    #[test]
    fn encoded_length_follows_padding_formula() {
        for n in [1usize, 15, 16, 17, 31, 32, 33, 100] {
            let secret = vec![b'x'; n];
            let entry = Entry::create("github", &secret, &KEY).unwrap();
            let expected = 4 + 4 + 16 + "github".len() + n.div_ceil(16) * 16;

            assert_eq!(entry.encode().len(), expected, "plain length {n}");
            assert_eq!(entry.serial_size(), expected);
            assert_eq!(&**entry.reveal(&KEY).unwrap(), secret.as_slice());
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let entry = Entry::create("bank", b"hunter2", &KEY).unwrap();
        let decoded = Entry::decode(&entry.encode()).unwrap();

        assert_eq!(decoded, entry);
        assert_eq!(&**decoded.reveal(&KEY).unwrap(), b"hunter2");
    }

    #[test]
    fn encode_layout_is_big_endian() {
        let entry = Entry::create("ab", b"xyz", &KEY).unwrap();
        let bytes = entry.encode();

        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 3]);
        assert_eq!(&bytes[8..24], entry.iv());
        assert_eq!(&bytes[24..26], b"ab");
        assert_eq!(&bytes[26..], entry.blob());
    }

    #[test]
    fn every_truncation_is_rejected() {
        let bytes = Entry::create("name", b"secret value", &KEY).unwrap().encode();

        for cut in 0..bytes.len() {
            match Entry::decode(&bytes[..cut]) {
                Err(Error::Truncated) => {}
                other => panic!("cut at {cut}: expected Truncated, got {other:?}"),
            }
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = Entry::create("n", b"s", &KEY).unwrap().encode();
        bytes.push(0);

        assert!(matches!(Entry::decode(&bytes), Err(Error::InvalidFormat)));
    }

    #[test]
    fn decode_from_advances_cursor() {
        let a = Entry::create("a", b"one", &KEY).unwrap();
        let b = Entry::create("b", b"two", &KEY).unwrap();
        let mut bytes = a.encode();
        b.encode_into(&mut bytes);

        let mut cursor = bytes.as_slice();
        assert_eq!(Entry::decode_from(&mut cursor).unwrap(), a);
        assert_eq!(Entry::decode_from(&mut cursor).unwrap(), b);
        assert!(cursor.is_empty());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            Entry::create("n", b"", &KEY),
            Err(Error::EmptySecret)
        ));

        let mut bytes = Entry::create("n", b"s", &KEY).unwrap().encode();
        bytes[4..8].copy_from_slice(&0u32.to_be_bytes());
        assert!(matches!(Entry::decode(&bytes), Err(Error::EmptySecret)));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            Entry::create("", b"s", &KEY),
            Err(Error::InvalidName)
        ));
    }

    #[test]
    fn fresh_iv_per_entry() {
        let a = Entry::create("n", b"same", &KEY).unwrap();
        let b = Entry::create("n", b"same", &KEY).unwrap();

        assert_ne!(a.iv(), b.iv());
        assert_ne!(a.blob(), b.blob());
    }

    #[test]
    fn wrong_key_reveals_garbage_without_error() {
        let entry = Entry::create("n", b"correct secret", &KEY).unwrap();
        let revealed = entry.reveal(&[0x43; KEY_LEN]).unwrap();

        assert_eq!(revealed.len(), 14);
        assert_ne!(&**revealed, b"correct secret");
    }

    #[test]
    fn reveal_rejects_inconsistent_blob() {
        let mut entry = Entry::create("n", b"abc", &KEY).unwrap();
        entry.blob.truncate(8);

        assert!(matches!(entry.reveal(&KEY), Err(Error::InvalidFormat)));
    }

    #[test]
    fn destroy_consumes_entry() {
        let entry = Entry::create("n", b"secret", &KEY).unwrap();
        entry.destroy();
    }
}
