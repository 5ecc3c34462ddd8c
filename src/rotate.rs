//! Password change and key rotation.
//!
//! A fresh salt and key set are derived and every entry is re-encrypted
//! into a new collection before anything in the container is touched. If
//! any step fails the container keeps its old salt, keys and entries.

use tracing::info;

use crate::Container;
use crate::crypto::{self, KeySet, SALT_LEN};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::store::EntryCollection;

struct Rekeyed {
    salt: [u8; SALT_LEN],
    keys: KeySet,
    entries: EntryCollection,
}

/// Re-key `container` under `new_password`.
///
/// On success the nonce counter restarts at 1 and the container is dirty.
/// The cost parameters are kept.
pub fn rotate(container: &mut Container, new_password: &[u8]) -> Result<()> {
    let rekeyed = rekey(container, new_password)?;
    let count = rekeyed.entries.count();

    // old keys and entries are wiped as they drop
    container.salt = rekeyed.salt;
    container.keys = rekeyed.keys;
    container.entries = rekeyed.entries;
    container.nonce = 1;
    container.dirty = true;

    info!(entries = count, "rotated container keys");
    Ok(())
}

fn rekey(container: &Container, new_password: &[u8]) -> Result<Rekeyed> {
    let salt = crypto::generate_salt()?;
    let keys = crypto::derive_keys(new_password, &salt, container.cost).map_err(|e| match e {
        Error::AllocationFailure => Error::AllocationFailure,
        _ => Error::KeyDerivationFailed,
    })?;

    let mut entries = EntryCollection::new();
    for old in container.entries.iter() {
        let plaintext = old.reveal(container.keys.entry())?;
        entries.add(Entry::create(old.name(), &plaintext, keys.entry())?)?;
    }

    Ok(Rekeyed {
        salt,
        keys,
        entries,
    })
}
