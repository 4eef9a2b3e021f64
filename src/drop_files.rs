//! Encoding for the shell `DROPFILES` file list block.
//!
//! Layout: a 20-byte little-endian header (`pFiles`, `pt.x`, `pt.y`, `fNC`,
//! `fWide`) followed by the paths as null-separated strings ending in a double
//! null. Paths are always written as UTF-16LE; decoding also accepts the
//! narrow form so blocks produced by other sources can be inspected. Narrow
//! blocks are in the sender's ANSI code page, which is not known here, so
//! they are decoded lossily: ASCII paths come back exact, other bytes may be
//! replaced with U+FFFD.

use crate::error::DragError;

/// Byte length of the `DROPFILES` header and offset of the first path.
pub const HEADER_LEN: usize = 20;

/// Ordered, validated list of absolute paths offered by one drag session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDropPayload {
    paths: Vec<String>,
}

impl FileDropPayload {
    /// Validate and take ownership of `paths`.
    pub fn new(paths: Vec<String>) -> Result<Self, DragError> {
        validate(&paths)?;
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Encode the payload. Cannot fail because the paths were validated.
    pub fn encode(&self) -> EncodedBlock {
        encode_unchecked(&self.paths)
    }
}

/// A complete `DROPFILES` block ready to be copied into shared memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    bytes: Vec<u8>,
}

impl EncodedBlock {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Encode `paths` into a wide-character `DROPFILES` block.
pub fn encode<S: AsRef<str>>(paths: &[S]) -> Result<EncodedBlock, DragError> {
    validate(paths)?;
    Ok(encode_unchecked(paths))
}

/// Byte length `encode` produces for `paths`.
pub fn encoded_len<S: AsRef<str>>(paths: &[S]) -> usize {
    let units: usize = paths
        .iter()
        .map(|path| path.as_ref().encode_utf16().count() + 1)
        .sum();
    HEADER_LEN + (units + 1) * 2
}

/// Decode a `DROPFILES` block back into its ordered path list.
pub fn decode(bytes: &[u8]) -> Result<Vec<String>, DragError> {
    if bytes.len() < HEADER_LEN {
        return Err(malformed(format!(
            "block is {} bytes, shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    let offset = read_u32(bytes, 0) as usize;
    let wide = read_u32(bytes, 16) != 0;
    if offset < HEADER_LEN || offset > bytes.len() {
        return Err(malformed(format!("path offset {offset} is out of bounds")));
    }
    let body = &bytes[offset..];
    let paths = if wide {
        decode_wide(body)?
    } else {
        decode_narrow(body)?
    };
    if paths.is_empty() {
        return Err(malformed("block contains no paths".into()));
    }
    Ok(paths)
}

fn validate<S: AsRef<str>>(paths: &[S]) -> Result<(), DragError> {
    if paths.is_empty() {
        return Err(DragError::InvalidInput("No files to drag".into()));
    }
    for path in paths {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(DragError::InvalidInput("Empty path in file list".into()));
        }
        if path.contains('\0') {
            return Err(DragError::InvalidInput(format!(
                "Path contains an embedded null: {:?}",
                path
            )));
        }
    }
    Ok(())
}

fn encode_unchecked<S: AsRef<str>>(paths: &[S]) -> EncodedBlock {
    let mut bytes = Vec::with_capacity(encoded_len(paths));
    bytes.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());
    // pt.x, pt.y, fNC
    bytes.extend_from_slice(&[0u8; 12]);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    for path in paths {
        for unit in path.as_ref().encode_utf16().chain(std::iter::once(0)) {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
    }
    bytes.extend_from_slice(&0u16.to_le_bytes()); // Double null-terminator.
    EncodedBlock { bytes }
}

fn decode_wide(body: &[u8]) -> Result<Vec<String>, DragError> {
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    split_terminated(&units)?
        .into_iter()
        .map(|segment| {
            String::from_utf16(segment).map_err(|err| malformed(format!("invalid UTF-16: {err}")))
        })
        .collect()
}

/// Decode an `fWide = 0` body. The bytes are ANSI code page text; anything
/// that is not valid UTF-8 is replaced rather than rejected.
fn decode_narrow(body: &[u8]) -> Result<Vec<String>, DragError> {
    Ok(split_terminated(body)?
        .into_iter()
        .map(|segment| String::from_utf8_lossy(segment).into_owned())
        .collect())
}

/// Split a null-separated sequence that ends in an empty entry.
fn split_terminated<T: Copy + Default + PartialEq>(units: &[T]) -> Result<Vec<&[T]>, DragError> {
    let zero = T::default();
    let mut segments = Vec::new();
    let mut start = 0;
    while start < units.len() {
        let Some(len) = units[start..].iter().position(|unit| *unit == zero) else {
            break;
        };
        if len == 0 {
            return Ok(segments);
        }
        segments.push(&units[start..start + len]);
        start += len + 1;
    }
    Err(malformed("missing double null terminator".into()))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn malformed(message: String) -> DragError {
    DragError::MalformedBlock(message)
}
