//! Archive module - the in-memory chunk collection and its edits.
//!
//! An [`Archive`] owns an ordered list of [`Chunk`] values, the marker they
//! will be joined with, and the signature table used to classify them. It
//! tracks whether the list has drifted from what was last loaded or saved:
//!
//! ```text
//!   Empty --load--> LoadedClean --append/replace/delete--> LoadedDirty
//!     ^                  ^                                     |
//!     |                  +-------------- save -----------------+
//!     +---- clear (from any state)
//! ```
//!
//! Nothing here touches the filesystem; see [`store`] for that.

pub mod store;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::container::{self, Marker};
use crate::error::{ChunkError, Result};
use crate::sniff::SignatureRegistry;

/// One payload inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    data: Vec<u8>,
    extension: String,
    description: String,
    /// Source file name for chunks added from disk; never written out
    label: Option<String>,
}

impl Chunk {
    fn classify(
        index: usize,
        data: Vec<u8>,
        label: Option<String>,
        registry: &SignatureRegistry,
    ) -> Self {
        let class = registry.sniff(&data);
        tracing::debug!(
            "Chunk {}: {} bytes -> {} ({:?})",
            index,
            data.len(),
            class.extension,
            class.kind
        );
        Self {
            index,
            data,
            extension: class.extension,
            description: class.description,
            label,
        }
    }

    /// Position in the container (serialization order)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Inferred extension, e.g. `".png"`
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// `chunk_{index}{ext}`, or the label with the extension appended when
    /// it does not already end with it
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) if label.ends_with(&self.extension) => label.clone(),
            Some(label) => format!("{}{}", label, self.extension),
            None => format!("chunk_{}{}", self.index, self.extension),
        }
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Lifecycle state of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveState {
    /// Never populated, or cleared
    Empty,
    /// Matches the bytes last loaded or saved
    LoadedClean,
    /// Edited since the last load or save
    LoadedDirty,
}

impl std::fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveState::Empty => write!(f, "empty"),
            ArchiveState::LoadedClean => write!(f, "saved"),
            ArchiveState::LoadedDirty => write!(f, "modified"),
        }
    }
}

/// Ordered chunk collection with dirty tracking.
///
/// Mutation needs `&mut self`; a host sharing one archive across threads
/// should wrap the whole value in a single mutex.
#[derive(Debug, Clone)]
pub struct Archive {
    chunks: Vec<Chunk>,
    marker: Marker,
    registry: SignatureRegistry,
    state: ArchiveState,
    path: Option<PathBuf>,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(Marker::default(), SignatureRegistry::builtin())
    }
}

impl Archive {
    /// Empty archive using `marker` and `registry`
    pub fn new(marker: Marker, registry: SignatureRegistry) -> Self {
        Self {
            chunks: Vec::new(),
            marker,
            registry,
            state: ArchiveState::Empty,
            path: None,
        }
    }

    /// Replace every chunk with `payloads` and classify them; state becomes clean
    pub fn load<I, B>(&mut self, payloads: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        self.chunks = payloads
            .into_iter()
            .enumerate()
            .map(|(i, data)| Chunk::classify(i, data.into(), None, &self.registry))
            .collect();
        self.state = ArchiveState::LoadedClean;
    }

    /// Split `blob` on this archive's marker and load the pieces
    pub fn load_blob(&mut self, blob: &[u8]) {
        let marker = self.marker.clone();
        self.load(container::split(blob, &marker));
    }

    /// Add a chunk at the end; returns its index
    pub fn append(&mut self, data: impl Into<Vec<u8>>) -> usize {
        self.push(data.into(), None)
    }

    /// Add a chunk carrying its source file name
    pub fn append_labeled(&mut self, data: impl Into<Vec<u8>>, label: impl Into<String>) -> usize {
        self.push(data.into(), Some(label.into()))
    }

    fn push(&mut self, data: Vec<u8>, label: Option<String>) -> usize {
        let index = self.chunks.len();
        self.warn_on_collision(index, &data);
        self.chunks
            .push(Chunk::classify(index, data, label, &self.registry));
        self.state = ArchiveState::LoadedDirty;
        index
    }

    /// Swap the payload at `index`; returns the chunk that was there.
    ///
    /// Any size is accepted. Confirming a size change is the caller's job.
    pub fn replace(&mut self, index: usize, data: impl Into<Vec<u8>>) -> Result<Chunk> {
        let len = self.chunks.len();
        if index >= len {
            return Err(ChunkError::IndexOutOfRange { index, len });
        }

        let data = data.into();
        self.warn_on_collision(index, &data);
        let fresh = Chunk::classify(index, data, None, &self.registry);
        let old = std::mem::replace(&mut self.chunks[index], fresh);
        self.state = ArchiveState::LoadedDirty;
        Ok(old)
    }

    /// Remove the chunks at `indices` (duplicates ignored); returns how many
    /// were removed.
    ///
    /// Every index is checked before anything is removed, so a bad index
    /// leaves the archive untouched.
    pub fn delete<I>(&mut self, indices: I) -> Result<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let targets: BTreeSet<usize> = indices.into_iter().collect();
        let len = self.chunks.len();
        if let Some(&index) = targets.iter().find(|&&i| i >= len) {
            return Err(ChunkError::IndexOutOfRange { index, len });
        }
        if targets.is_empty() {
            return Ok(0);
        }

        // Highest first so earlier removals never shift later targets
        for &index in targets.iter().rev() {
            self.chunks.remove(index);
        }
        for (i, chunk) in self.chunks.iter_mut().enumerate() {
            chunk.index = i;
        }

        self.state = ArchiveState::LoadedDirty;
        Ok(targets.len())
    }

    /// Drop every chunk and forget the backing path
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.path = None;
        self.state = ArchiveState::Empty;
    }

    /// Join the chunks with this archive's marker
    pub fn serialize(&self) -> Result<Vec<u8>> {
        container::serialize(&self.chunks, &self.marker)
    }

    /// Record a successful write to `path`
    pub fn mark_saved(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
        self.state = ArchiveState::LoadedClean;
    }

    /// Swap the signature table and re-classify every chunk.
    ///
    /// Payloads are unchanged, so the dirty flag is left alone.
    pub fn set_registry(&mut self, registry: SignatureRegistry) {
        self.registry = registry;
        let chunks = std::mem::take(&mut self.chunks);
        self.chunks = chunks
            .into_iter()
            .map(|c| Chunk::classify(c.index, c.data, c.label, &self.registry))
            .collect();
    }

    fn warn_on_collision(&self, index: usize, data: &[u8]) {
        if let Some((_, offset)) = container::find_collision(&[data], &self.marker) {
            tracing::warn!(
                "Chunk {} contains the container marker at offset {}; saving will fail",
                index,
                offset
            );
        }
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == ArchiveState::LoadedDirty
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Like [`get`](Self::get) but reports a missing chunk as an error
    pub fn chunk(&self, index: usize) -> Result<&Chunk> {
        self.chunks.get(index).ok_or(ChunkError::IndexOutOfRange {
            index,
            len: self.chunks.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    /// Backing file, if the archive was opened from or saved to one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// Total payload bytes, markers excluded
    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }
}

impl<'a> IntoIterator for &'a Archive {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}
