//! Container module - split and rebuild marker-delimited blobs.
//!
//! A container is a flat run of payloads with a fixed marker between each
//! pair. There is no header, count or offset table: chunk boundaries exist
//! only where the marker occurs. A payload that itself contains the marker
//! cannot survive a round trip, so [`serialize`] refuses to produce one.

use std::fmt;

use memchr::memmem;

use crate::error::{ChunkError, Result};
use crate::sniff::signatures::decode_hex;

/// Marker used by Ren'Py-built containers: `Made with Ren'Py.`
pub const RENPY_MARKER: &[u8] = b"Made with Ren'Py.";

/// Non-empty byte sequence separating chunks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker(Vec<u8>);

impl Marker {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ChunkError::EmptyMarker);
        }
        Ok(Self(bytes))
    }

    /// Parse a hex marker such as `"4D 61 64 65"`
    pub fn from_hex(text: &str) -> Result<Self> {
        Self::new(decode_hex(text, "marker")?)
    }

    pub fn renpy() -> Self {
        Self(RENPY_MARKER.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::renpy()
    }
}

impl AsRef<[u8]> for Marker {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.escape_ascii())
    }
}

/// Split `data` on every non-overlapping, leftmost occurrence of `marker`.
///
/// K occurrences always yield K+1 chunks; a marker at either end or two
/// adjacent markers produce empty chunks.
pub fn split<'a>(data: &'a [u8], marker: &Marker) -> Vec<&'a [u8]> {
    let needle = marker.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;

    for pos in memmem::find_iter(data, needle) {
        chunks.push(&data[start..pos]);
        start = pos + needle.len();
    }
    chunks.push(&data[start..]);

    tracing::debug!(
        "Split {} bytes into {} chunks on marker {}",
        data.len(),
        chunks.len(),
        marker
    );
    chunks
}

/// Number of marker occurrences `split` would cut on
pub fn count_markers(data: &[u8], marker: &Marker) -> usize {
    memmem::find_iter(data, marker.as_bytes()).count()
}

/// First place where joining `chunks` would put a marker somewhere other
/// than a separator, as `(chunk index, byte offset within that chunk)`.
///
/// Catches markers inside a chunk as well as self-overlapping markers that
/// straddle a chunk boundary (`"a|"` then `"b"` joined with `"||"`).
pub fn find_collision<C: AsRef<[u8]>>(chunks: &[C], marker: &Marker) -> Option<(usize, usize)> {
    let joined = join(chunks, marker);
    scan_separators(&joined, chunks, marker)
}

/// Join chunks with `marker` strictly between neighbours.
///
/// Fails with [`ChunkError::MarkerCollision`] if the result would not split
/// back into exactly these chunks.
pub fn serialize<C: AsRef<[u8]>>(chunks: &[C], marker: &Marker) -> Result<Vec<u8>> {
    let out = join(chunks, marker);

    if let Some((index, offset)) = scan_separators(&out, chunks, marker) {
        tracing::warn!(
            "Chunk {} collides with marker {} at offset {}",
            index,
            marker,
            offset
        );
        return Err(ChunkError::MarkerCollision { index, offset });
    }

    Ok(out)
}

fn join<C: AsRef<[u8]>>(chunks: &[C], marker: &Marker) -> Vec<u8> {
    let payload: usize = chunks.iter().map(|c| c.as_ref().len()).sum();
    let separators = chunks.len().saturating_sub(1) * marker.len();
    let mut out = Vec::with_capacity(payload + separators);

    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(marker.as_bytes());
        }
        out.extend_from_slice(chunk.as_ref());
    }
    out
}

/// Walk the marker matches `split` would cut on and compare them with the
/// separators `join` placed. The first match that is not a separator starts
/// inside chunk `k`, where `k` separators have matched so far.
fn scan_separators<C: AsRef<[u8]>>(
    joined: &[u8],
    chunks: &[C],
    marker: &Marker,
) -> Option<(usize, usize)> {
    let mut chunk_start = 0;
    let mut index = 0;

    for pos in memmem::find_iter(joined, marker.as_bytes()) {
        let separator = chunks
            .get(index)
            .filter(|_| index + 1 < chunks.len())
            .map(|c| chunk_start + c.as_ref().len());

        if separator == Some(pos) {
            chunk_start = pos + marker.len();
            index += 1;
        } else {
            return Some((index, pos - chunk_start));
        }
    }
    None
}
