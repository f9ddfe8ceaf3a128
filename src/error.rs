//! Error types for container handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the container engine and its file-facing helpers.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Source unreadable or destination unwritable
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mutation referenced a chunk that does not exist
    #[error("chunk index {index} out of range (archive has {len} chunks)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A chunk payload contains the marker and would re-split differently
    #[error("chunk {index} contains the container marker at byte offset {offset}")]
    MarkerCollision { index: usize, offset: usize },

    /// Markers must have at least one byte
    #[error("container marker must not be empty")]
    EmptyMarker,

    #[error("invalid hex in {what}: {reason}")]
    InvalidHex { what: String, reason: String },

    /// Nothing to write; an empty blob would re-open as one empty chunk
    #[error("archive has no chunks to save")]
    EmptyArchive,

    /// Signature table could not be loaded from disk
    #[error("signature file {}: {reason}", path.display())]
    SignatureFile { path: PathBuf, reason: String },
}

impl ChunkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, ChunkError>;
