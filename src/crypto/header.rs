use super::kdf::CostParams;
use super::{HEADER_LEN, KEY_LEN, MAGIC_LEN, SALT_LEN, SIGNED_LEN, TAG_LEN, VER_LEN, mac};
use crate::error::{Error, Result};

pub const VERSION_V0: u8 = 0;
pub const MAGIC: &[u8; MAGIC_LEN] = b"lockbox";

const BLOCK_SIZE_AT: usize = MAGIC_LEN + VER_LEN;
const PARALLELISM_AT: usize = 12;
const LOG_COST_AT: usize = 16;
const RESERVED_AT: usize = 17;
const SALT_AT: usize = 24;
const NONCE_AT: usize = 56;
const PAYLOAD_LEN_AT: usize = 64;
const PADDING_AT: usize = 72;
pub const PADDING_LEN: usize = SIGNED_LEN - PADDING_AT;

/// Fixed-size container header.
///
/// ```text
/// MAGIC (7) | VERSION (1) | r (4) | p (4) | logN (1) | RESERVED (7) |
/// SALT (32) | NONCE (8) | PAYLOAD_LEN (8) | PADDING (24) | TAG (32)
/// ```
///
/// The tag is HMAC-SHA256 under the MAC key over the first 96 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    cost: CostParams,
    salt: [u8; SALT_LEN],
    nonce: u64,
    payload_len: u64,
}

impl Header {
    pub fn new(cost: CostParams, salt: [u8; SALT_LEN], nonce: u64, payload_len: u64) -> Self {
        Self {
            cost,
            salt,
            nonce,
            payload_len,
        }
    }

    pub fn cost(&self) -> &CostParams {
        &self.cost
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Serialize and sign. `padding` fills the random region.
    pub fn seal(
        &self,
        mac_key: &[u8; KEY_LEN],
        padding: &[u8; PADDING_LEN],
    ) -> Result<[u8; HEADER_LEN]> {
        let mut buf = [0u8; HEADER_LEN];

        buf[..MAGIC_LEN].copy_from_slice(MAGIC);
        buf[MAGIC_LEN] = VERSION_V0;
        buf[BLOCK_SIZE_AT..PARALLELISM_AT].copy_from_slice(&self.cost.block_size().to_be_bytes());
        buf[PARALLELISM_AT..LOG_COST_AT].copy_from_slice(&self.cost.parallelism().to_be_bytes());
        buf[LOG_COST_AT] = self.cost.log_cost();
        // RESERVED_AT..SALT_AT stays zero
        buf[SALT_AT..NONCE_AT].copy_from_slice(&self.salt);
        buf[NONCE_AT..PAYLOAD_LEN_AT].copy_from_slice(&self.nonce.to_be_bytes());
        buf[PAYLOAD_LEN_AT..PADDING_AT].copy_from_slice(&self.payload_len.to_be_bytes());
        buf[PADDING_AT..SIGNED_LEN].copy_from_slice(padding);

        let tag = mac::tag(mac_key, &buf[..SIGNED_LEN])?;
        buf[SIGNED_LEN..].copy_from_slice(&tag);

        Ok(buf)
    }

    /// Parse the unauthenticated fields. Callers must derive keys from the
    /// returned salt and cost, then call [`Header::verify`] before trusting
    /// anything else.
    ///
    /// Cost parameters are not validated here; the KDF does that.
    pub fn parse(data: &[u8; HEADER_LEN]) -> Result<Self> {
        if &data[..MAGIC_LEN] != MAGIC {
            return Err(Error::InvalidFormat);
        }

        if data[MAGIC_LEN] != VERSION_V0 {
            return Err(Error::InvalidFormat);
        }

        let block_size = u32::from_be_bytes(be(&data[BLOCK_SIZE_AT..PARALLELISM_AT]));
        let parallelism = u32::from_be_bytes(be(&data[PARALLELISM_AT..LOG_COST_AT]));
        let log_cost = data[LOG_COST_AT];

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[SALT_AT..NONCE_AT]);

        let nonce = u64::from_be_bytes(be(&data[NONCE_AT..PAYLOAD_LEN_AT]));
        let payload_len = u64::from_be_bytes(be(&data[PAYLOAD_LEN_AT..PADDING_AT]));

        Ok(Header {
            cost: CostParams::unchecked(log_cost, block_size, parallelism),
            salt,
            nonce,
            payload_len,
        })
    }

    /// Constant-time check of the stored header tag.
    pub fn verify(data: &[u8; HEADER_LEN], mac_key: &[u8; KEY_LEN]) -> Result<()> {
        mac::verify(mac_key, &data[..SIGNED_LEN], &data[SIGNED_LEN..SIGNED_LEN + TAG_LEN])
    }

    /// The reserved bytes are covered by the tag, so they are only checked
    /// for being zero after verification.
    pub fn reserved_is_zero(data: &[u8; HEADER_LEN]) -> bool {
        data[RESERVED_AT..SALT_AT].iter().all(|b| *b == 0)
    }
}

fn be<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}
