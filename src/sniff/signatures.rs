//! File signature registry used to classify chunks.
//!
//! The registry is an ordered list of magic prefixes. Order is part of the
//! contract: lookups walk the table front to back and the first entry whose
//! magic is a prefix of the data wins, so a short magic listed early shadows
//! any longer magic sharing its first bytes.
//!
//! Tables come from a JSON file shaped like
//! `{"signatures": [{"magic": "89504E47", "extension": ".png", "description": "PNG Image"}]}`.
//! When that file is missing or broken the built-in table is used instead.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};

/// Built-in signature table: (hex magic, extension, description)
const BUILTIN_SIGNATURES: &[(&str, &str, &str)] = &[
    ("89504E47", ".png", "PNG Image"),
    ("FFD8FF", ".jpg", "JPEG Image"),
    ("4F676753", ".ogg", "Ogg Vorbis Audio"),
    ("52494646", ".wav", "WAV Audio"),
    ("494433", ".mp3", "MP3 Audio"),
    ("664C6143", ".flac", "FLAC Audio"),
    ("1A45DFA3", ".mkv", "Matroska Video"),
    ("0000002066747970", ".mp4", "MP4 Video"),
    ("25504446", ".pdf", "PDF Document"),
    ("7B5C727466", ".rtf", "Rich Text Format"),
    ("504B0304", ".zip", "ZIP Archive"),
    ("7F454C46", ".elf", "ELF Executable"),
    ("4D5A", ".exe", "Windows Executable"),
    ("2321", ".sh", "Shell Script"),
    ("47494638", ".gif", "GIF Image"),
    ("52617221", ".rar", "RAR Archive"),
    ("1F8B08", ".gz", "GZIP Archive"),
];

/// On-disk form of a signature entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// Hex-encoded magic prefix
    pub magic: String,
    /// Extension including the leading dot
    pub extension: String,
    /// Human-readable format name
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SignatureFile {
    signatures: Vec<SignatureRecord>,
}

/// A decoded signature: magic bytes plus what they identify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub magic: Vec<u8>,
    pub extension: String,
    pub description: String,
}

impl SignatureEntry {
    pub fn new(magic: Vec<u8>, extension: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            magic,
            extension: extension.into(),
            description: description.into(),
        }
    }

    /// Decode a record, rejecting bad hex and empty magics
    pub fn from_record(record: &SignatureRecord) -> Result<Self> {
        let magic = decode_hex(&record.magic, &format!("signature {}", record.extension))?;
        if magic.is_empty() {
            return Err(ChunkError::InvalidHex {
                what: format!("signature {}", record.extension),
                reason: "magic is empty".to_string(),
            });
        }
        Ok(Self::new(magic, record.extension.clone(), record.description.clone()))
    }

    pub fn to_record(&self) -> SignatureRecord {
        SignatureRecord {
            magic: hex::encode_upper(&self.magic),
            extension: self.extension.clone(),
            description: self.description.clone(),
        }
    }

    /// Byte-exact prefix comparison
    pub fn matches(&self, data: &[u8]) -> bool {
        data.starts_with(&self.magic)
    }
}

/// Decode hex, tolerating ASCII whitespace and either case
pub fn decode_hex(text: &str, what: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&compact).map_err(|e| ChunkError::InvalidHex {
        what: what.to_string(),
        reason: e.to_string(),
    })
}

/// The built-in table, in precedence order
pub fn builtin_signatures() -> Vec<SignatureEntry> {
    BUILTIN_SIGNATURES
        .iter()
        .map(|(magic, ext, desc)| {
            SignatureEntry::new(hex::decode(magic).unwrap_or_default(), *ext, *desc)
        })
        .collect()
}

/// Where the active table came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureSource {
    /// Compiled-in defaults
    Builtin,
    /// Parsed from this file
    File(PathBuf),
}

impl std::fmt::Display for SignatureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureSource::Builtin => write!(f, "built-in table"),
            SignatureSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Ordered, first-match-wins signature table
#[derive(Debug, Clone)]
pub struct SignatureRegistry {
    entries: Vec<SignatureEntry>,
    backing: Option<PathBuf>,
    source: SignatureSource,
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SignatureRegistry {
    /// Registry over the compiled-in table
    pub fn builtin() -> Self {
        Self {
            entries: builtin_signatures(),
            backing: None,
            source: SignatureSource::Builtin,
        }
    }

    /// Registry over caller-supplied entries, kept in the given order
    pub fn from_entries(entries: Vec<SignatureEntry>) -> Self {
        Self {
            entries,
            backing: None,
            source: SignatureSource::Builtin,
        }
    }

    /// Load from `path`, falling back to the built-in table on any failure
    pub fn load(path: &Path) -> Self {
        let mut registry = Self::builtin();
        registry.backing = Some(path.to_path_buf());
        registry.reload();
        registry
    }

    /// Load from `path`, reporting failures instead of falling back
    pub fn load_strict(path: &Path) -> Result<Self> {
        let entries = read_signature_file(path)?;
        Ok(Self {
            entries,
            backing: Some(path.to_path_buf()),
            source: SignatureSource::File(path.to_path_buf()),
        })
    }

    /// Re-read the backing file and swap the table in one step.
    ///
    /// On failure the built-in table takes over, same as the initial load.
    pub fn reload(&mut self) -> &SignatureSource {
        let Some(path) = self.backing.clone() else {
            return &self.source;
        };

        match read_signature_file(&path) {
            Ok(entries) => {
                tracing::debug!(
                    "Loaded {} signatures from {}",
                    entries.len(),
                    path.display()
                );
                self.entries = entries;
                self.source = SignatureSource::File(path);
            }
            Err(e) => {
                if path.exists() {
                    tracing::warn!("{}; using built-in signatures", e);
                } else {
                    tracing::debug!("{} not found; using built-in signatures", path.display());
                }
                self.entries = builtin_signatures();
                self.source = SignatureSource::Builtin;
            }
        }

        &self.source
    }

    /// First entry whose magic prefixes `data`
    pub fn classify(&self, data: &[u8]) -> Option<&SignatureEntry> {
        self.entries.iter().find(|sig| sig.matches(data))
    }

    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> &SignatureSource {
        &self.source
    }

    /// Write the active table as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ChunkError::io(parent, e))?;
            }
        }

        let file = SignatureFile {
            signatures: self.entries.iter().map(SignatureEntry::to_record).collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| ChunkError::SignatureFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        fs::write(path, json).map_err(|e| ChunkError::io(path, e))
    }
}

fn read_signature_file(path: &Path) -> Result<Vec<SignatureEntry>> {
    let content = fs::read_to_string(path).map_err(|e| ChunkError::io(path, e))?;

    let file: SignatureFile =
        serde_json::from_str(&content).map_err(|e| ChunkError::SignatureFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    file.signatures
        .iter()
        .map(SignatureEntry::from_record)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| ChunkError::SignatureFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
