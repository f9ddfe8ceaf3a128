//! rpa-splice Library
//!
//! Inspect and edit marker-delimited containers: blobs made of payload
//! chunks joined by a fixed byte sequence (by default `Made with Ren'Py.`).
//!
//! # Features
//!
//! - **Splitting**: Non-overlapping, leftmost marker search with `memchr`
//! - **Type Sniffing**: Configurable magic-number table with a text heuristic fallback
//! - **Editing**: Append, replace and atomic multi-delete with dirty tracking
//! - **Safe Saving**: Refuses payloads that would corrupt the chunk layout
//! - **Extraction**: Collision-free file names and blake3 manifests
//!
//! # Example
//!
//! ```no_run
//! use rpa_splice::archive::store;
//! use rpa_splice::{Marker, SignatureRegistry};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::new("game.rpa");
//!     let mut archive = store::open(path, Marker::renpy(), SignatureRegistry::builtin())?;
//!
//!     for chunk in &archive {
//!         println!("{} {}", chunk.display_name(), chunk.len());
//!     }
//!
//!     archive.append(b"new payload".to_vec());
//!     store::save(&mut archive, path)?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod export;
pub mod info;
pub mod sniff;

// Re-export commonly used types
pub use archive::{Archive, ArchiveState, Chunk};
pub use config::Config;
pub use container::{serialize, split, Marker};
pub use error::{ChunkError, Result};
pub use export::{ExtractOptions, ExtractResult, Exporter};
pub use info::{ChunkInfo, Summary};
pub use sniff::{infer_extension, SignatureEntry, SignatureRegistry};
