//! Cryptographic primitives for the container.
//!
//! Provides key derivation, the payload stream cipher, message
//! authentication, and container header handling.

pub mod header;
pub mod kdf;
pub mod mac;
pub mod stream;

pub use header::Header;
pub use kdf::{CostParams, KeySet, derive_keys};

use crate::error::{Error, Result};
use getrandom::fill;

/// Length of the KDF salt (32 bytes).
pub const SALT_LEN: usize = 32;
/// Length of every derived key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of an HMAC-SHA256 tag.
pub const TAG_LEN: usize = 32;
/// Length of a per-entry CBC initialization vector.
pub const IV_LEN: usize = 16;
/// AES block size; entry secrets are padded to a multiple of this.
pub const BLOCK_LEN: usize = 16;
/// Length of the magic bytes ("lockbox").
pub const MAGIC_LEN: usize = 7;
/// Length of the version field (1 byte).
pub const VER_LEN: usize = 1;
/// Number of header bytes covered by the header tag.
pub const SIGNED_LEN: usize = 96;
/// Full header length, tag included.
pub const HEADER_LEN: usize = SIGNED_LEN + TAG_LEN;

/// Fill buffer with cryptographically secure random bytes
pub fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| Error::Random)
}

/// Generate salt
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a per-entry IV
pub fn generate_iv() -> Result<[u8; IV_LEN]> {
    let mut iv = [0u8; IV_LEN];
    secure_random(&mut iv)?;
    Ok(iv)
}
