//! Type sniffing - guess a chunk's file extension from its bytes.
//!
//! Classification order:
//!
//! 1. **Signature**: first registry entry whose magic prefixes the data
//! 2. **Text**: every byte in the first 1024 is printable ASCII, tab, LF or CR
//! 3. **Binary**: everything else, including empty data
//!
//! Falling through to `.txt` or `.bin` is a normal outcome, not an error.

pub mod signatures;

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

pub use signatures::{SignatureEntry, SignatureRecord, SignatureRegistry, SignatureSource};

/// Number of leading bytes inspected by the text heuristic
pub const TEXT_SNIFF_LEN: usize = 1024;

pub const TEXT_EXTENSION: &str = ".txt";
pub const BINARY_EXTENSION: &str = ".bin";

/// How a classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// A registry magic matched
    Signature,
    /// Text heuristic
    Text,
    /// Nothing else applied
    Binary,
}

/// Result of classifying a byte sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub extension: String,
    pub description: String,
    pub kind: MatchKind,
}

impl SignatureRegistry {
    /// Full classification of `data` against this table
    pub fn sniff(&self, data: &[u8]) -> Classification {
        if let Some(sig) = self.classify(data) {
            return Classification {
                extension: sig.extension.clone(),
                description: sig.description.clone(),
                kind: MatchKind::Signature,
            };
        }

        if looks_like_text(data) {
            Classification {
                extension: TEXT_EXTENSION.to_string(),
                description: "Text".to_string(),
                kind: MatchKind::Text,
            }
        } else {
            Classification {
                extension: BINARY_EXTENSION.to_string(),
                description: "Binary data".to_string(),
                kind: MatchKind::Binary,
            }
        }
    }

    /// Extension only, e.g. `".png"`
    pub fn infer_extension<'a>(&'a self, data: &[u8]) -> &'a str {
        match self.classify(data) {
            Some(sig) => sig.extension.as_str(),
            None if looks_like_text(data) => TEXT_EXTENSION,
            None => BINARY_EXTENSION,
        }
    }
}

/// Text heuristic over the first [`TEXT_SNIFF_LEN`] bytes.
///
/// Empty input is not text.
pub fn looks_like_text(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    data.iter()
        .take(TEXT_SNIFF_LEN)
        .all(|&b| (0x20..=0x7E).contains(&b) || matches!(b, 0x09 | 0x0A | 0x0D))
}

fn builtin_registry() -> &'static SignatureRegistry {
    static BUILTIN: OnceLock<SignatureRegistry> = OnceLock::new();
    BUILTIN.get_or_init(SignatureRegistry::builtin)
}

/// Infer an extension using the built-in signature table
pub fn infer_extension(data: &[u8]) -> &'static str {
    builtin_registry().infer_extension(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_and_jpeg() {
        assert_eq!(
            infer_extension(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            ".png"
        );
        assert_eq!(infer_extension(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), ".jpg");
    }

    #[test]
    fn test_other_builtin_formats() {
        assert_eq!(infer_extension(b"%PDF-1.7\n"), ".pdf");
        assert_eq!(infer_extension(b"MZ\x90\x00"), ".exe");
        assert_eq!(infer_extension(b"\x7fELF\x02\x01"), ".elf");
        assert_eq!(infer_extension(b"GIF89a"), ".gif");
        assert_eq!(infer_extension(b"\x00\x00\x00\x20ftypisom"), ".mp4");
        assert_eq!(infer_extension(b"\x1f\x8b\x08\x00"), ".gz");
    }

    #[test]
    fn test_signature_beats_text_heuristic() {
        // "#!/bin/sh" is printable but the shell magic comes first
        assert_eq!(infer_extension(b"#!/bin/sh\necho hi\n"), ".sh");
        // "RIFF" is printable too
        assert_eq!(infer_extension(b"RIFF....WAVEfmt "), ".wav");
    }

    #[test]
    fn test_text_heuristic() {
        assert_eq!(infer_extension(b"label start:\n\t\"Hello\"\r\n"), ".txt");
        assert_eq!(infer_extension(b"hello\x00world"), ".bin");
        assert_eq!(infer_extension(b"caf\xc3\xa9"), ".bin");
        assert_eq!(infer_extension(&[0x7F]), ".bin");
    }

    #[test]
    fn test_text_heuristic_only_inspects_prefix() {
        let mut data = vec![b'a'; TEXT_SNIFF_LEN];
        data.push(0x00);
        assert_eq!(infer_extension(&data), ".txt");

        data[TEXT_SNIFF_LEN - 1] = 0x00;
        assert_eq!(infer_extension(&data), ".bin");
    }

    #[test]
    fn test_empty_is_binary() {
        assert_eq!(infer_extension(&[]), ".bin");
        assert!(!looks_like_text(&[]));
        assert_eq!(
            SignatureRegistry::builtin().sniff(&[]).kind,
            MatchKind::Binary
        );
    }

    #[test]
    fn test_sniff_reports_description() {
        let registry = SignatureRegistry::builtin();
        let c = registry.sniff(b"PK\x03\x04rest");
        assert_eq!(c.extension, ".zip");
        assert_eq!(c.description, "ZIP Archive");
        assert_eq!(c.kind, MatchKind::Signature);

        let c = registry.sniff(b"plain words");
        assert_eq!(c.kind, MatchKind::Text);
    }

    #[test]
    fn test_custom_registry_is_used() {
        let registry = SignatureRegistry::from_entries(vec![SignatureEntry::new(
            b"RPA-3.0".to_vec(),
            ".rpa",
            "Ren'Py Archive",
        )]);
        assert_eq!(registry.infer_extension(b"RPA-3.0 0000"), ".rpa");
        // PNG is not in this table
        assert_eq!(registry.infer_extension(&[0x89, 0x50, 0x4E, 0x47]), ".bin");
    }
}
