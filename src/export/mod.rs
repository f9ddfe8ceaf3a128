//! Export module - write chunks out as standalone files
//!
//! Names come from each chunk's display name, stripped down to a safe
//! character set. Existing files are never overwritten: a clash gets a
//! `_1`, `_2`, ... suffix before the extension. An optional JSON manifest
//! records the blake3 hash of everything written.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::archive::{Archive, Chunk};
use crate::error::ChunkError;

pub const MANIFEST_NAME: &str = "manifest.json";

/// Extraction configuration
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Destination directory (created if missing)
    pub dest: PathBuf,
    /// Only chunks whose display name matches this glob
    pub pattern: Option<String>,
    /// Write `manifest.json` next to the extracted files
    pub create_manifest: bool,
    /// Plan names without writing anything
    pub dry_run: bool,
}

/// One extracted chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFile {
    pub index: usize,
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub extension: String,
    pub blake3_hash: String,
}

/// Result of an extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    pub files: Vec<ExtractedFile>,
    pub total_bytes: u64,
    pub manifest_path: Option<PathBuf>,
}

/// Manifest file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractManifest {
    pub version: u32,
    pub created_at: String,
    pub archive: Option<String>,
    pub dest_root: String,
    pub total_files: usize,
    pub total_bytes: u64,
    pub entries: Vec<ExtractedFile>,
}

/// Progress information for callbacks
#[derive(Debug, Clone)]
pub struct ExtractProgress {
    pub total: usize,
    pub completed: usize,
    pub current_file: String,
}

/// Chunk extractor
pub struct Exporter {
    options: ExtractOptions,
}

impl Exporter {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extract the chunks at `indices`, or every chunk when `None`.
    ///
    /// Indices are validated before anything touches the disk.
    pub fn extract<F>(
        &self,
        archive: &Archive,
        indices: Option<&[usize]>,
        progress_callback: F,
    ) -> Result<ExtractResult>
    where
        F: Fn(ExtractProgress),
    {
        let selected = select_chunks(archive, indices)?;
        let matcher = self.matcher()?;
        let selected: Vec<&Chunk> = selected
            .into_iter()
            .filter(|c| {
                matcher
                    .as_ref()
                    .map_or(true, |m| m.is_match(c.display_name()))
            })
            .collect();

        let dest = &self.options.dest;
        if !self.options.dry_run {
            fs::create_dir_all(dest)
                .with_context(|| format!("Failed to create destination: {}", dest.display()))?;
        }

        let mut result = ExtractResult::default();
        let mut claimed = HashSet::new();
        let total = selected.len();

        for (n, chunk) in selected.into_iter().enumerate() {
            let name = sanitize_name(&chunk.display_name(), n);
            let path = unique_path(dest, &name, &claimed);
            claimed.insert(path.clone());

            progress_callback(ExtractProgress {
                total,
                completed: n,
                current_file: name.clone(),
            });

            if !self.options.dry_run {
                fs::write(&path, chunk.data())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            tracing::debug!("Chunk {} -> {}", chunk.index(), path.display());

            result.total_bytes += chunk.len() as u64;
            result.files.push(ExtractedFile {
                index: chunk.index(),
                name,
                path,
                size: chunk.len() as u64,
                extension: chunk.extension().to_string(),
                blake3_hash: blake3::hash(chunk.data()).to_hex().to_string(),
            });
        }

        progress_callback(ExtractProgress {
            total,
            completed: total,
            current_file: String::new(),
        });

        if self.options.create_manifest && !self.options.dry_run {
            let path = unique_path(dest, MANIFEST_NAME, &claimed);
            let manifest = ExtractManifest {
                version: 1,
                created_at: Utc::now().to_rfc3339(),
                archive: archive.path().map(|p| p.to_string_lossy().to_string()),
                dest_root: dest.to_string_lossy().to_string(),
                total_files: result.files.len(),
                total_bytes: result.total_bytes,
                entries: result.files.clone(),
            };
            let json = serde_json::to_string_pretty(&manifest)?;
            fs::write(&path, json)
                .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
            result.manifest_path = Some(path);
        }

        tracing::info!(
            "Extracted {} chunks ({} bytes) to {}",
            result.files.len(),
            result.total_bytes,
            dest.display()
        );
        Ok(result)
    }

    fn matcher(&self) -> Result<Option<GlobMatcher>> {
        self.options
            .pattern
            .as_deref()
            .map(|p| {
                Glob::new(p)
                    .map(|g| g.compile_matcher())
                    .with_context(|| format!("Invalid name pattern: {}", p))
            })
            .transpose()
    }
}

fn select_chunks<'a>(archive: &'a Archive, indices: Option<&[usize]>) -> Result<Vec<&'a Chunk>> {
    match indices {
        None => Ok(archive.iter().collect()),
        Some(indices) => {
            let mut seen = HashSet::new();
            let mut out = Vec::with_capacity(indices.len());
            for &index in indices {
                let chunk = archive.chunk(index)?;
                if seen.insert(index) {
                    out.push(chunk);
                }
            }
            Ok(out)
        }
    }
}

/// Keep alphanumerics and `._- `; fall back to `file_{n}` when nothing survives
pub fn sanitize_name(name: &str, n: usize) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || "._- ".contains(*c))
        .collect();
    if safe.is_empty() {
        format!("file_{}", n)
    } else {
        safe
    }
}

/// First free path for `name` in `dir`: `name`, then `stem_1.ext`, `stem_2.ext`, ...
pub fn unique_path(dir: &Path, name: &str, claimed: &HashSet<PathBuf>) -> PathBuf {
    let taken = |p: &Path| p.exists() || claimed.contains(p);

    let candidate = dir.join(name);
    if !taken(&candidate) {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Convenience wrapper: is this error a bad chunk index?
pub fn is_index_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ChunkError>(),
        Some(ChunkError::IndexOutOfRange { .. })
    )
}
