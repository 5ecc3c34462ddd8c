//! Container file format.
//!
//! Reads the fixed header, checks the magic and dispatches on the version
//! byte. Payloads move through the codec in [`RW_BLOCK`] chunks.

use std::io::{self, Read, Write};

use crate::Container;
use crate::crypto::header::{MAGIC, VERSION_V0};
use crate::crypto::{HEADER_LEN, MAGIC_LEN};
use crate::error::{Error, Result};

pub mod v0;

/// Chunk size for streaming payload bytes to and from the file.
pub const RW_BLOCK: usize = 64 * 1024;
/// Format version written by this build.
pub const CURRENT_VERSION: u8 = VERSION_V0;

/// Encrypt and write `container` in the current format.
pub(crate) fn write<W: Write>(container: &mut Container, out: W) -> Result<u64> {
    v0::write(container, out)
}

/// Read, authenticate and decrypt a container.
pub(crate) fn read<R: Read>(mut input: R, password: &[u8]) -> Result<Container> {
    let mut header = [0u8; HEADER_LEN];
    read_exact(&mut input, &mut header)?;

    if &header[..MAGIC_LEN] != MAGIC {
        return Err(Error::InvalidFormat);
    }

    match header[MAGIC_LEN] {
        VERSION_V0 => v0::read(&header, input, password),
        version => {
            tracing::debug!(version, "unsupported container version");
            Err(Error::InvalidFormat)
        }
    }
}

/// `read_exact` where running out of input means a malformed file.
pub(crate) fn read_exact<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::InvalidFormat,
        _ => Error::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_invalid_format() {
        let data = vec![0u8; HEADER_LEN - 1];
        assert!(matches!(
            read(data.as_slice(), b"pw"),
            Err(Error::InvalidFormat)
        ));
    }

    #[test]
    fn invalid_magic_fails() {
        let mut data = vec![0u8; HEADER_LEN + 32];
        data[..7].copy_from_slice(b"notlock");

        assert!(matches!(
            read(data.as_slice(), b"pw"),
            Err(Error::InvalidFormat)
        ));
    }

    #[test]
    fn unsupported_version_fails() {
        let mut data = vec![0u8; HEADER_LEN + 32];
        data[..7].copy_from_slice(MAGIC);
        data[7] = 99;

        assert!(matches!(
            read(data.as_slice(), b"pw"),
            Err(Error::InvalidFormat)
        ));
    }
}
