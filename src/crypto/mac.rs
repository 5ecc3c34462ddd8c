use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{KEY_LEN, TAG_LEN};
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8; KEY_LEN]) -> Result<HmacSha256> {
    // HMAC takes keys of any length; this only fails on a broken build.
    <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| Error::KeyDerivationFailed)
}

/// HMAC-SHA256 of `data` under `key`.
pub fn tag(key: &[u8; KEY_LEN], data: &[u8]) -> Result<[u8; TAG_LEN]> {
    let mut mac = keyed(key)?;
    mac.update(data);
    Ok(to_tag(mac))
}

fn to_tag(mac: HmacSha256) -> [u8; TAG_LEN] {
    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Constant-time check of `expected` against the HMAC of `data`.
pub fn verify(key: &[u8; KEY_LEN], data: &[u8], expected: &[u8]) -> Result<()> {
    let mut mac = keyed(key)?;
    mac.update(data);
    mac.verify_slice(expected).map_err(|_| Error::InvalidFormat)
}

/// MAC accumulated over the header and ciphertext as they stream past.
pub struct RunningMac(HmacSha256);

impl RunningMac {
    pub fn new(key: &[u8; KEY_LEN]) -> Result<Self> {
        Ok(Self(keyed(key)?))
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    pub fn finish(self) -> [u8; TAG_LEN] {
        to_tag(self.0)
    }

    pub fn verify(self, expected: &[u8]) -> Result<()> {
        self.0.verify_slice(expected).map_err(|_| Error::InvalidFormat)
    }
}
