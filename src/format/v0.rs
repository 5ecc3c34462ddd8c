//! File format v0.
//!
//! ```text
//! HEADER (128) | CIPHERTEXT (PAYLOAD_LEN) | TAG (32)
//! ```
//!
//! The payload is the serialized entry collection XORed with the ChaCha20
//! keystream for `(stream key, nonce counter)`. The trailing tag is
//! HMAC-SHA256 under the MAC key over header and ciphertext, so no header
//! field can be swapped independently of the payload it describes.

use std::io::{Read, Write};

use tracing::debug;
use zeroize::Zeroizing;

use super::{RW_BLOCK, read_exact};
use crate::Container;
use crate::crypto::header::PADDING_LEN;
use crate::crypto::mac::RunningMac;
use crate::crypto::{self, HEADER_LEN, Header, TAG_LEN, stream};
use crate::error::{Error, Result};
use crate::store::EntryCollection;

/// Write `container` and advance its nonce counter. Returns the number of
/// bytes emitted.
///
/// # Errors
///
/// [`Error::NonceExhausted`] when the counter is spent; nothing is written
/// and the container is untouched. The caller must rotate keys first.
pub(crate) fn write<W: Write>(container: &mut Container, mut out: W) -> Result<u64> {
    if container.nonce == u64::MAX {
        return Err(Error::NonceExhausted);
    }

    let mut payload = container.entries.serialize_all();
    let payload_len = payload.len() as u64;

    let header = Header::new(container.cost, container.salt, container.nonce, payload_len);
    let mut padding = [0u8; PADDING_LEN];
    crypto::secure_random(&mut padding)?;
    let header_bytes = header.seal(container.keys.mac(), &padding)?;

    stream::apply_keystream(container.keys.stream(), container.nonce, &mut payload);

    let mut mac = RunningMac::new(container.keys.mac())?;
    mac.update(&header_bytes);
    out.write_all(&header_bytes)?;

    for chunk in payload.chunks(RW_BLOCK) {
        mac.update(chunk);
        out.write_all(chunk)?;
    }

    out.write_all(&mac.finish())?;
    out.flush()?;

    debug!(
        nonce = container.nonce,
        payload_len, "wrote container payload"
    );

    container.nonce += 1;
    container.dirty = false;

    Ok((HEADER_LEN + TAG_LEN) as u64 + payload_len)
}

/// Authenticate and decrypt the rest of a v0 container whose header has
/// already been read.
///
/// Every failure after the magic check is [`Error::InvalidFormat`], whether
/// the password is wrong or the file is damaged. Derived keys live in a
/// zeroizing [`crypto::KeySet`] and are wiped on every early return.
pub(crate) fn read<R: Read>(
    header_bytes: &[u8; HEADER_LEN],
    mut input: R,
    password: &[u8],
) -> Result<Container> {
    let header = Header::parse(header_bytes)?;

    let keys = crypto::derive_keys(password, header.salt(), *header.cost()).map_err(|e| {
        debug!(error = %e, "key derivation from header parameters failed");
        Error::InvalidFormat
    })?;

    Header::verify(header_bytes, keys.mac())?;
    if !Header::reserved_is_zero(header_bytes) {
        return Err(Error::InvalidFormat);
    }

    let len = usize::try_from(header.payload_len()).map_err(|_| Error::AllocationFailure)?;
    let mut payload = Zeroizing::new(Vec::new());
    payload
        .try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailure)?;
    payload.resize(len, 0);

    let mut mac = RunningMac::new(keys.mac())?;
    mac.update(header_bytes);
    for chunk in payload.chunks_mut(RW_BLOCK) {
        read_exact(&mut input, chunk)?;
        mac.update(chunk);
    }

    let mut tag = [0u8; TAG_LEN];
    read_exact(&mut input, &mut tag)?;
    mac.verify(&tag)?;

    stream::apply_keystream(keys.stream(), header.nonce(), &mut payload);
    let entries = EntryCollection::deserialize_all(&payload).map_err(|_| Error::InvalidFormat)?;

    debug!(
        nonce = header.nonce(),
        entries = entries.count(),
        "read container payload"
    );

    Ok(Container {
        cost: *header.cost(),
        salt: *header.salt(),
        // the stored counter encrypted this file; the next write moves past it
        nonce: header.nonce().saturating_add(1),
        keys,
        entries,
        dirty: false,
    })
}
