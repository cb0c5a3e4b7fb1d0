//! Frame codec for log entries and snapshots.
//!
//! Files start with a header (`PCAN` magic + format version). After that
//! come frames:
//!
//! ```text
//! [length: 4 bytes LE][payload: N bytes JSON][crc32 of payload: 4 bytes LE]
//! ```
//!
//! A frame cut short by a crash decodes as `ErrorKind::UnexpectedEof`; a
//! frame whose checksum does not match decodes as `ErrorKind::InvalidData`.

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use crc32fast::Hasher;
use serde::{de::DeserializeOwned, Serialize};

/// Current on-disk format version.
pub const FORMAT_VERSION: u8 = 1;

/// Magic bytes at the start of every store file.
pub const MAGIC: [u8; 4] = *b"PCAN";

/// Size of the file header in bytes.
pub const HEADER_LEN: u64 = 5;

const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Serializes `value` into one checksummed frame.
///
/// Fails with `ErrorKind::InvalidInput` if the payload is larger than
/// [`decode`] accepts, so nothing is ever written that cannot be read back.
pub fn encode<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    encode_limited(value, MAX_FRAME_LEN)
}

fn encode_limited<T: Serialize>(value: &T, max_len: usize) -> IoResult<Vec<u8>> {
    let data = serde_json::to_vec(value)
        .map_err(|e| IoError::new(ErrorKind::InvalidData, format!("serialization failed: {e}")))?;
    if data.len() > max_len {
        return Err(IoError::new(
            ErrorKind::InvalidInput,
            format!("frame size {} exceeds maximum {max_len}", data.len()),
        ));
    }
    let len = u32::try_from(data.len())
        .map_err(|_| IoError::new(ErrorKind::InvalidInput, "frame larger than 4 GiB"))?;

    let mut out = Vec::with_capacity(data.len() + 8);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&checksum(&data).to_le_bytes());
    Ok(out)
}

/// Reads one frame and deserializes it, verifying the checksum.
pub fn decode<T: DeserializeOwned>(reader: &mut impl Read) -> IoResult<T> {
    decode_limited(reader, MAX_FRAME_LEN)
}

fn decode_limited<T: DeserializeOwned>(reader: &mut impl Read, max_len: usize) -> IoResult<T> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > max_len {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("frame size {len} exceeds maximum {max_len}"),
        ));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;

    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes)?;
    let stored = u32::from_le_bytes(crc_bytes);
    let computed = checksum(&data);
    if stored != computed {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("CRC mismatch: stored={stored:08x}, computed={computed:08x}"),
        ));
    }

    serde_json::from_slice(&data)
        .map_err(|e| IoError::new(ErrorKind::InvalidData, format!("deserialization failed: {e}")))
}

/// Writes the file header.
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[FORMAT_VERSION])
}

/// Reads and validates the file header.
pub fn read_header(reader: &mut impl Read) -> IoResult<()> {
    let mut header = [0u8; 5];
    reader.read_exact(&mut header)?;
    if header[..4] != MAGIC {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("invalid magic bytes: {:?}", &header[..4]),
        ));
    }
    if header[4] != FORMAT_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                header[4]
            ),
        ));
    }
    Ok(())
}
