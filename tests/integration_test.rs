//! Integration tests for rpa-splice

use std::fs;
use std::path::Path;

use rpa_splice::archive::store;
use rpa_splice::export::{is_index_error, MANIFEST_NAME};
use rpa_splice::{
    Archive, ArchiveState, ChunkError, ExtractOptions, Exporter, Marker, SignatureRegistry,
};
use tempfile::tempdir;

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

/// Write a container of `chunks` joined by `marker`
fn write_container(path: &Path, chunks: &[Vec<u8>], marker: &Marker) {
    let blob = chunks.join(marker.as_bytes());
    fs::write(path, blob).unwrap();
}

fn png(body: &[u8]) -> Vec<u8> {
    let mut data = PNG_MAGIC.to_vec();
    data.extend_from_slice(body);
    data
}

// ============================================================================
// Open and classify
// ============================================================================

#[test]
fn test_open_classifies_chunks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("game.rpa");
    let marker = Marker::renpy();
    let image = png(b"pixels");
    write_container(
        &path,
        &[image, b"hello world".to_vec(), vec![0x00, 0x01, 0x02]],
        &marker,
    );

    let archive = store::open(&path, marker, SignatureRegistry::builtin()).unwrap();
    assert_eq!(archive.state(), ArchiveState::LoadedClean);

    let exts: Vec<&str> = archive.iter().map(|c| c.extension()).collect();
    assert_eq!(exts, vec![".png", ".txt", ".bin"]);

    let names: Vec<String> = archive.iter().map(|c| c.display_name()).collect();
    assert_eq!(names, vec!["chunk_0.png", "chunk_1.txt", "chunk_2.bin"]);
}

#[test]
fn test_open_without_marker_is_single_chunk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.bin");
    fs::write(&path, b"no separators here").unwrap();

    let archive = store::open(&path, Marker::renpy(), SignatureRegistry::builtin()).unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive.get(0).unwrap().data(), b"no separators here");
}

#[test]
fn test_open_empty_file_is_one_empty_chunk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.rpa");
    fs::write(&path, b"").unwrap();

    let archive = store::open(&path, Marker::renpy(), SignatureRegistry::builtin()).unwrap();
    assert_eq!(archive.len(), 1);
    assert!(archive.get(0).unwrap().is_empty());
    assert_eq!(archive.get(0).unwrap().extension(), ".bin");
}

// ============================================================================
// Edit and save
// ============================================================================

#[test]
fn test_full_edit_workflow() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("game.rpa");
    let marker = Marker::renpy();
    let chunks: Vec<Vec<u8>> = ["alpha", "beta", "gamma", "delta"]
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect();
    write_container(&path, &chunks, &marker);

    let mut archive = store::open(&path, marker.clone(), SignatureRegistry::builtin()).unwrap();

    archive.append(JPEG_MAGIC.to_vec());
    let old = archive.replace(1, png(b"new")).unwrap();
    assert_eq!(old.data(), b"beta");
    assert_eq!(archive.delete([0, 2]).unwrap(), 2);
    assert_eq!(archive.state(), ArchiveState::LoadedDirty);

    let out = dir.path().join("out").join("edited.rpa");
    store::save(&mut archive, &out).unwrap();
    assert_eq!(archive.state(), ArchiveState::LoadedClean);
    assert_eq!(archive.path(), Some(out.as_path()));

    let reopened = store::open(&out, marker, SignatureRegistry::builtin()).unwrap();
    let exts: Vec<&str> = reopened.iter().map(|c| c.extension()).collect();
    assert_eq!(exts, vec![".png", ".txt", ".jpg"]);
    assert_eq!(reopened.get(1).unwrap().data(), b"delta");
    let indices: Vec<usize> = reopened.iter().map(|c| c.index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_saved_bytes_are_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("abc.rpa");
    let marker = Marker::new(b"|".to_vec()).unwrap();

    let mut archive = Archive::new(marker, SignatureRegistry::builtin());
    archive.load([b"a".to_vec(), Vec::new(), b"c".to_vec()]);
    store::save(&mut archive, &path).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"a||c");
}

#[test]
fn test_delete_with_bad_index_leaves_archive_untouched() {
    let mut archive = Archive::default();
    archive.load([b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

    let err = archive.delete([1, 7]).unwrap_err();
    assert!(matches!(err, ChunkError::IndexOutOfRange { index: 7, len: 3 }));
    assert_eq!(archive.len(), 3);
    assert_eq!(archive.state(), ArchiveState::LoadedClean);
}

#[test]
fn test_collision_blocks_save_until_fixed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("game.rpa");
    let marker = Marker::renpy();

    let mut bad = b"xx".to_vec();
    bad.extend_from_slice(marker.as_bytes());

    let mut archive = Archive::new(marker, SignatureRegistry::builtin());
    archive.append(b"ok".to_vec());
    archive.append(bad);

    let err = store::save(&mut archive, &path).unwrap_err();
    assert!(matches!(err, ChunkError::MarkerCollision { index: 1, offset: 2 }));
    assert!(!path.exists());

    archive.replace(1, b"fine now".to_vec()).unwrap();
    store::save(&mut archive, &path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_overlapping_marker_across_boundary_blocks_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overlap.rpa");
    let marker = Marker::new(b"aa".to_vec()).unwrap();

    let mut archive = Archive::new(marker, SignatureRegistry::builtin());
    archive.load([b"xa".to_vec(), b"y".to_vec()]);
    archive.append(b"z".to_vec());

    let err = store::save(&mut archive, &path).unwrap_err();
    assert!(matches!(err, ChunkError::MarkerCollision { index: 0, offset: 1 }));
    assert!(!path.exists());
    assert!(archive.is_dirty());
}

// ============================================================================
// Custom signatures
// ============================================================================

#[test]
fn test_custom_signature_file() {
    let dir = tempdir().unwrap();
    let sigs = dir.path().join("signatures.json");
    fs::write(
        &sigs,
        r#"{"signatures":[{"magic":"CAFE","extension":".caf","description":"Cafe"}]}"#,
    )
    .unwrap();

    let registry = SignatureRegistry::load(&sigs);
    assert_eq!(registry.len(), 1);

    let path = dir.path().join("game.rpa");
    let marker = Marker::renpy();
    write_container(&path, &[vec![0xCA, 0xFE, 0x01], PNG_MAGIC.to_vec()], &marker);

    let archive = store::open(&path, marker, registry).unwrap();
    assert_eq!(archive.get(0).unwrap().extension(), ".caf");
    // PNG is not in the custom table and the bytes are not text
    assert_eq!(archive.get(1).unwrap().extension(), ".bin");
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_extract_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("game.rpa");
    let marker = Marker::renpy();
    let image = png(b"body");
    write_container(&path, &[b"readme".to_vec(), image.clone()], &marker);

    let archive = store::open(&path, marker, SignatureRegistry::builtin()).unwrap();
    let dest = dir.path().join("extracted");
    let exporter = Exporter::new(ExtractOptions {
        dest: dest.clone(),
        create_manifest: true,
        ..Default::default()
    });

    let result = exporter.extract(&archive, None, |_| {}).unwrap();
    assert_eq!(result.files.len(), 2);
    assert_eq!(fs::read(dest.join("chunk_0.txt")).unwrap(), b"readme");
    assert_eq!(fs::read(dest.join("chunk_1.png")).unwrap(), image);
    assert!(dest.join(MANIFEST_NAME).exists());

    // Second run must not clobber the first
    let again = exporter.extract(&archive, Some(&[1][..]), |_| {}).unwrap();
    assert_eq!(again.files[0].path, dest.join("chunk_1_1.png"));
}

#[test]
fn test_extract_bad_index_is_index_error() {
    let dir = tempdir().unwrap();
    let mut archive = Archive::default();
    archive.append(b"only".to_vec());

    let exporter = Exporter::new(ExtractOptions {
        dest: dir.path().join("never"),
        ..Default::default()
    });
    let err = exporter.extract(&archive, Some(&[0, 3][..]), |_| {}).unwrap_err();
    assert!(is_index_error(&err));
    assert!(!dir.path().join("never").exists());
}
