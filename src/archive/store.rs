//! Reading and writing archives on disk.
//!
//! These are the only archive operations that perform I/O. Errors carry the
//! offending path and are never retried.

use std::fs;
use std::path::Path;

use super::Archive;
use crate::container::Marker;
use crate::error::{ChunkError, Result};
use crate::sniff::SignatureRegistry;

/// Read `path`, split it on `marker` and classify every chunk
pub fn open(path: &Path, marker: Marker, registry: SignatureRegistry) -> Result<Archive> {
    let blob = fs::read(path).map_err(|e| ChunkError::io(path, e))?;

    let mut archive = Archive::new(marker, registry);
    archive.load_blob(&blob);
    archive.set_path(Some(path.to_path_buf()));

    tracing::info!(
        "Opened {} ({} bytes, {} chunks)",
        path.display(),
        blob.len(),
        archive.len()
    );
    Ok(archive)
}

/// Serialize `archive` to `path` and mark it clean.
///
/// Refuses empty archives and payloads containing the marker; nothing is
/// written in either case.
pub fn save(archive: &mut Archive, path: &Path) -> Result<()> {
    if archive.is_empty() {
        return Err(ChunkError::EmptyArchive);
    }

    let blob = archive.serialize()?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ChunkError::io(parent, e))?;
        }
    }
    fs::write(path, &blob).map_err(|e| ChunkError::io(path, e))?;

    archive.mark_saved(path);
    tracing::info!(
        "Saved {} ({} bytes, {} chunks)",
        path.display(),
        blob.len(),
        archive.len()
    );
    Ok(())
}

/// Read a payload file destined for an add or replace
pub fn read_payload(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| ChunkError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveState;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.rpa");

        let err = open(&missing, Marker::default(), SignatureRegistry::builtin()).unwrap_err();
        match err {
            ChunkError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_open_edit_save_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("game.rpa");
        let marker = Marker::default();

        let mut blob = b"first".to_vec();
        blob.extend_from_slice(marker.as_bytes());
        blob.extend_from_slice(b"%PDF-1.4");
        fs::write(&path, &blob).unwrap();

        let mut archive = open(&path, marker.clone(), SignatureRegistry::builtin()).unwrap();
        assert_eq!(archive.state(), ArchiveState::LoadedClean);
        assert_eq!(archive.path(), Some(path.as_path()));
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get(1).unwrap().extension(), ".pdf");

        archive.append(b"third".to_vec());
        assert!(archive.is_dirty());
        save(&mut archive, &path).unwrap();
        assert!(!archive.is_dirty());

        let reopened = open(&path, marker, SignatureRegistry::builtin()).unwrap();
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.get(2).unwrap().data(), b"third");
    }

    #[test]
    fn test_save_empty_archive_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.rpa");

        let mut archive = Archive::default();
        assert!(matches!(save(&mut archive, &path), Err(ChunkError::EmptyArchive)));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_collision_writes_nothing_and_stays_dirty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.rpa");
        let marker = Marker::default();

        let mut payload = b"prefix ".to_vec();
        payload.extend_from_slice(marker.as_bytes());

        let mut archive = Archive::new(marker, SignatureRegistry::builtin());
        archive.append(payload);

        let err = save(&mut archive, &path).unwrap_err();
        assert!(matches!(err, ChunkError::MarkerCollision { index: 0, offset: 7 }));
        assert!(!path.exists());
        assert!(archive.is_dirty());
    }
}
