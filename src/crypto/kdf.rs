use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::KEY_LEN;
use crate::error::{Error, Result};

/// Upper bound on the scrypt working set, in bytes.
pub const MAX_KDF_MEMORY: u64 = 4 << 30;

/// Bytes of KDF output: stream key, MAC key, entry key.
const DERIVED_LEN: usize = 3 * KEY_LEN;

/// scrypt cost parameters, stored in clear in the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    log_cost: u8,
    block_size: u32,
    parallelism: u32,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            // N = 2^16
            log_cost: 16,
            block_size: 8,
            parallelism: 1,
        }
    }
}

impl CostParams {
    pub fn new(log_cost: u8, block_size: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            log_cost,
            block_size,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    /// Values read from an unauthenticated header; validated by [`derive_keys`].
    pub(crate) fn unchecked(log_cost: u8, block_size: u32, parallelism: u32) -> Self {
        Self {
            log_cost,
            block_size,
            parallelism,
        }
    }

    pub fn log_cost(&self) -> u8 {
        self.log_cost
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_cost < 1 || self.log_cost >= 64 {
            return Err(Error::InvalidParameters("log cost must be within 1..64"));
        }
        if self.block_size < 1 {
            return Err(Error::InvalidParameters("block size must be >= 1"));
        }
        if self.parallelism < 1 {
            return Err(Error::InvalidParameters("parallelism must be >= 1"));
        }
        if u64::from(self.block_size) * u64::from(self.parallelism) >= 1 << 30 {
            return Err(Error::InvalidParameters(
                "block size * parallelism must be below 2^30",
            ));
        }
        match self.memory_bytes() {
            Some(bytes) if bytes <= MAX_KDF_MEMORY => Ok(()),
            _ => Err(Error::InvalidParameters("memory cost exceeds the KDF limit")),
        }
    }

    /// scrypt working set: `128 * r * N` for the ROMix table plus
    /// `128 * r * p` for the block buffer.
    fn memory_bytes(&self) -> Option<u64> {
        let n = 1u64.checked_shl(u32::from(self.log_cost))?;
        let blocks = n.checked_add(u64::from(self.parallelism))?;
        128u64
            .checked_mul(u64::from(self.block_size))?
            .checked_mul(blocks)
    }

    fn to_scrypt(self) -> Result<scrypt::Params> {
        scrypt::Params::new(self.log_cost, self.block_size, self.parallelism)
            .map_err(|_| Error::InvalidParameters("rejected by scrypt"))
    }
}

impl fmt::Display for CostParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N=2^{} r={} p={}",
            self.log_cost, self.block_size, self.parallelism
        )
    }
}

/// The three keys of one derivation. Never persisted; wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeySet {
    stream: [u8; KEY_LEN],
    mac: [u8; KEY_LEN],
    entry: [u8; KEY_LEN],
}

impl KeySet {
    pub fn stream(&self) -> &[u8; KEY_LEN] {
        &self.stream
    }

    pub fn mac(&self) -> &[u8; KEY_LEN] {
        &self.mac
    }

    pub fn entry(&self) -> &[u8; KEY_LEN] {
        &self.entry
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet").finish_non_exhaustive()
    }
}

/// Derive the stream, MAC and entry keys from one scrypt run.
pub fn derive_keys(password: &[u8], salt: &[u8], cost: CostParams) -> Result<KeySet> {
    cost.validate()?;
    let params = cost.to_scrypt()?;
    reserve_working_set(cost)?;

    let mut derived = Zeroizing::new([0u8; DERIVED_LEN]);
    scrypt::scrypt(password, salt, &params, derived.as_mut())
        .map_err(|_| Error::KeyDerivationFailed)?;

    let mut keys = KeySet {
        stream: [0u8; KEY_LEN],
        mac: [0u8; KEY_LEN],
        entry: [0u8; KEY_LEN],
    };
    keys.stream.copy_from_slice(&derived[..KEY_LEN]);
    keys.mac.copy_from_slice(&derived[KEY_LEN..2 * KEY_LEN]);
    keys.entry.copy_from_slice(&derived[2 * KEY_LEN..]);

    Ok(keys)
}

/// scrypt aborts the process when its table allocation fails, so probe
/// for the memory first and report exhaustion as an error instead.
fn reserve_working_set(cost: CostParams) -> Result<()> {
    let bytes = cost
        .memory_bytes()
        .and_then(|b| usize::try_from(b).ok())
        .ok_or(Error::AllocationFailure)?;
    let mut probe: Vec<u8> = Vec::new();
    probe
        .try_reserve_exact(bytes)
        .map_err(|_| Error::AllocationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> CostParams {
        CostParams::new(4, 8, 1).unwrap()
    }

    #[test]
    fn kdf_is_deterministic() {
        let salt = [42u8; 32];

        let k1 = derive_keys(b"password", &salt, fast()).unwrap();
        let k2 = derive_keys(b"password", &salt, fast()).unwrap();

        assert_eq!(k1.stream(), k2.stream());
        assert_eq!(k1.mac(), k2.mac());
        assert_eq!(k1.entry(), k2.entry());
    }

    #[test]
    fn derived_keys_are_independent() {
        let keys = derive_keys(b"pw", &[1u8; 32], fast()).unwrap();

        assert_ne!(keys.stream(), keys.mac());
        assert_ne!(keys.mac(), keys.entry());
        assert_ne!(keys.stream(), keys.entry());
    }

    #[test]
    fn different_salts_give_different_keys() {
        let k1 = derive_keys(b"pw", &[1u8; 32], fast()).unwrap();
        let k2 = derive_keys(b"pw", &[2u8; 32], fast()).unwrap();

        assert_ne!(k1.stream(), k2.stream());
        assert_ne!(k1.mac(), k2.mac());
        assert_ne!(k1.entry(), k2.entry());
    }

    #[test]
    fn cost_params_affect_output() {
        let salt = [7u8; 32];
        let k1 = derive_keys(b"pw", &salt, fast()).unwrap();
        let k2 = derive_keys(b"pw", &salt, CostParams::new(5, 8, 1).unwrap()).unwrap();

        assert_ne!(k1.mac(), k2.mac());
    }

    #[test]
    fn block_size_times_parallelism_is_bounded() {
        assert!(matches!(
            CostParams::new(4, 1 << 15, 1 << 15),
            Err(Error::InvalidParameters(_))
        ));
        assert!(CostParams::new(4, 8, 1).is_ok());
    }

    #[test]
    fn zero_params_are_rejected() {
        assert!(CostParams::new(0, 8, 1).is_err());
        assert!(CostParams::new(4, 0, 1).is_err());
        assert!(CostParams::new(4, 8, 0).is_err());
    }

    #[test]
    fn oversized_memory_cost_is_rejected() {
        // 128 * 8 * 2^40 bytes
        assert!(matches!(
            CostParams::new(40, 8, 1),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn derive_rejects_invalid_params_from_header() {
        let cost = CostParams {
            log_cost: 4,
            block_size: 0,
            parallelism: 1,
        };
        assert!(matches!(
            derive_keys(b"pw", &[0u8; 32], cost),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn key_set_debug_is_redacted() {
        let keys = derive_keys(b"pw", &[3u8; 32], fast()).unwrap();
        assert_eq!(format!("{keys:?}"), "KeySet { .. }");
    }
}
