mod config;
mod crypto;
mod entry;
mod error;
mod format;
mod generate;
mod rotate;
mod storage;
mod store;

pub use crate::config::{Config, default_container_path};
pub use crate::crypto::{CostParams, KeySet, derive_keys};
pub use crate::crypto::kdf::MAX_KDF_MEMORY;
pub use crate::entry::Entry;
pub use crate::error::{Error, Result, StoreError};
pub use crate::format::{CURRENT_VERSION as FORMAT_VERSION, RW_BLOCK};
pub use crate::generate::{Charset, generate_password};
pub use crate::rotate::rotate;
pub use crate::storage::Storage;
pub use crate::store::EntryCollection;

use std::io::{Read, Write};

use crate::crypto::SALT_LEN;
use tracing::{info, warn};
use zeroize::{Zeroize, Zeroizing};

/// An unlocked credential container.
///
/// Holds the derived keys and the entry collection in memory. Secrets stay
/// encrypted under the entry key until [`Container::get_credential`]
/// decrypts one on demand.
pub struct Container {
    pub(crate) cost: CostParams,
    pub(crate) salt: [u8; SALT_LEN],
    /// Nonce for the next write.
    pub(crate) nonce: u64,
    pub(crate) keys: KeySet,
    pub(crate) entries: EntryCollection,
    pub(crate) dirty: bool,
}

impl Drop for Container {
    fn drop(&mut self) {
        self.salt.zeroize();
    }
}

impl Container {
    /// Create an empty container with a fresh salt.
    ///
    /// The new container is dirty: nothing exists on disk until it is saved.
    pub fn create(password: &str, cost: CostParams) -> Result<Self> {
        let salt = crypto::generate_salt()?;
        let keys = crypto::derive_keys(password.as_bytes(), &salt, cost)?;

        info!(%cost, "created container");

        Ok(Self {
            cost,
            salt,
            nonce: 1,
            keys,
            entries: EntryCollection::new(),
            dirty: true,
        })
    }

    /// Open the container stored at `storage`.
    pub fn open(storage: &Storage, password: &str) -> Result<Self> {
        let container = Self::read_from(storage.open()?, password)?;
        info!(
            path = %storage.path().display(),
            entries = container.count(),
            "opened container"
        );
        Ok(container)
    }

    /// Read a container from any byte stream.
    pub fn read_from<R: Read>(input: R, password: &str) -> Result<Self> {
        format::read(input, password.as_bytes())
    }

    /// Encrypt and write the container to any byte stream.
    ///
    /// Consumes one nonce and clears the dirty flag on success.
    pub fn write_to<W: Write>(&mut self, out: W) -> Result<()> {
        format::write(self, out).map(|_| ())
    }

    /// Write the container to `storage`, replacing the previous file
    /// atomically.
    pub fn save(&mut self, storage: &Storage) -> Result<()> {
        storage.save_with(|out| self.write_to(out))?;
        info!(
            path = %storage.path().display(),
            entries = self.count(),
            "saved container"
        );
        Ok(())
    }

    /// Like [`Container::save`], but re-keys under `password` and retries
    /// once when the nonce counter is exhausted.
    pub fn save_or_rotate(&mut self, storage: &Storage, password: &str) -> Result<()> {
        match self.save(storage) {
            Err(Error::NonceExhausted) => {
                warn!("nonce counter exhausted, rotating keys");
                self.change_password(password)?;
                self.save(storage)
            }
            other => other,
        }
    }

    /// Re-key every entry under `new_password`. See [`rotate()`].
    pub fn change_password(&mut self, new_password: &str) -> Result<()> {
        rotate::rotate(self, new_password.as_bytes())
    }

    pub fn add_credential(&mut self, name: &str, secret: &[u8]) -> Result<()> {
        if self.entries.contains(name) {
            return Err(StoreError::DuplicateName(name.to_string()).into());
        }
        let entry = Entry::create(name, secret, self.keys.entry())?;
        self.entries.add(entry)?;
        self.dirty = true;
        Ok(())
    }

    /// Decrypt the secret stored under `name`.
    pub fn get_credential(&self, name: &str) -> Result<Zeroizing<Vec<u8>>> {
        self.entries.find(name)?.reveal(self.keys.entry())
    }

    pub fn remove_credential(&mut self, name: &str) -> Result<()> {
        self.entries.remove(name)?.destroy();
        self.dirty = true;
        Ok(())
    }

    /// Entry names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.names()
    }

    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Whether there are changes not yet written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn nonce_counter(&self) -> u64 {
        self.nonce
    }

    pub fn cost(&self) -> CostParams {
        self.cost
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }
}
