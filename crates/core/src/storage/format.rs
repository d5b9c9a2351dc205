use crate::errors::CoreError;

/// Magic bytes identifying a PFLG (portfolio ledger) file.
pub const MAGIC: &[u8; 4] = b"PFLG";

/// Current file format version.
pub const CURRENT_VERSION: u16 = 1;

/// Header size in bytes: magic(4) + version(2) + payload_len(8) = 14
pub const HEADER_SIZE: usize = 14;

/// Extension used for portfolio files inside a storage directory.
pub const FILE_EXTENSION: &str = "pflg";

/// File header read from a .pflg blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u16,
    pub payload_len: u64,
}

/// Frame a serialized portfolio.
///
/// Layout:
/// ```text
/// [PFLG: 4B] [version: 2B LE] [payload_len: 8B LE] [payload: variable]
/// ```
pub fn write_blob(version: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Parse and validate the header. Returns it with the payload slice.
///
/// Trailing bytes past the declared payload are ignored.
pub fn read_blob(data: &[u8]) -> Result<(FileHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be a valid PFLG file".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes: not a PFLG file".into(),
        ));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let payload_len = u64::from_le_bytes(data[6..HEADER_SIZE].try_into().map_err(|_| {
        CoreError::InvalidFileFormat("Failed to read payload length".into())
    })?);

    let available = (data.len() - HEADER_SIZE) as u64;
    if available < payload_len {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {payload_len} bytes of payload, got {available}"
        )));
    }

    let end = HEADER_SIZE + payload_len as usize;
    Ok((FileHeader { version, payload_len }, &data[HEADER_SIZE..end]))
}
