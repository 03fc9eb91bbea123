//! Tests for the ID file
//!
//! These tests verify:
//! - Dense, sequential ID allocation starting at 1
//! - O(1) slot layout (slot `id` at byte `id * 8`)
//! - Header validation and partial-slot repair
//! - Clear and reopen behaviour

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use valuestore::idfile::{IdFile, HEADER_LENGTH, ITEM_SIZE};
use valuestore::StoreError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_id_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("values.id");
    (temp_dir, path)
}

// =============================================================================
// Open / Header Tests
// =============================================================================

#[test]
fn test_open_writes_padded_header() {
    let (_temp, path) = setup_temp_id_file();

    let id_file = IdFile::open(&path, false).unwrap();

    assert_eq!(id_file.max_id(), 0);
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64, HEADER_LENGTH);
    assert_eq!(&bytes[0..4], b"nif\x01");
    assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
}

#[test]
fn test_open_rejects_wrong_magic() {
    let (_temp, path) = setup_temp_id_file();
    fs::write(&path, b"ndf\x01\0\0\0\0").unwrap();

    let result = IdFile::open(&path, false);

    assert!(matches!(result, Err(StoreError::InvalidMagic { .. })));
}

#[test]
fn test_open_rejects_newer_version() {
    let (_temp, path) = setup_temp_id_file();
    fs::write(&path, b"nif\x09\0\0\0\0").unwrap();

    let result = IdFile::open(&path, false);

    assert!(matches!(
        result,
        Err(StoreError::UnsupportedVersion { found: 9, max: 1, .. })
    ));
}

#[test]
fn test_open_rejects_version_below_minimum() {
    let (_temp, path) = setup_temp_id_file();
    fs::write(&path, b"nif\x00\0\0\0\0").unwrap();

    let result = IdFile::open(&path, false);

    assert!(matches!(
        result,
        Err(StoreError::UnsupportedVersion { found: 0, min: 1, .. })
    ));
}

#[test]
fn test_open_rejects_short_header() {
    let (_temp, path) = setup_temp_id_file();
    fs::write(&path, b"nif\x01").unwrap();

    let result = IdFile::open(&path, false);

    assert!(matches!(result, Err(StoreError::TruncatedHeader { .. })));
}

#[test]
fn test_open_truncates_partial_slot() {
    let (_temp, path) = setup_temp_id_file();
    {
        let id_file = IdFile::open(&path, false).unwrap();
        id_file.store_offset(4).unwrap();
        id_file.close().unwrap();
    }

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0, 0, 0]).unwrap();
    drop(file);

    let id_file = IdFile::open(&path, false).unwrap();

    assert_eq!(id_file.max_id(), 1);
    assert_eq!(fs::metadata(&path).unwrap().len(), 2 * ITEM_SIZE);
    assert_eq!(id_file.store_offset(20).unwrap(), 2);
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_ids_are_dense_and_sequential() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();

    for expected in 1..=50u32 {
        let id = id_file.store_offset(expected as u64 * 100).unwrap();
        assert_eq!(id, expected);
        assert_eq!(id_file.max_id(), expected);
    }

    let size = fs::metadata(&path).unwrap().len();
    assert_eq!(size, ITEM_SIZE * (50 + 1));
}

#[test]
fn test_get_offset_returns_stored_value() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();

    let a = id_file.store_offset(4).unwrap();
    let b = id_file.store_offset(123_456_789_012).unwrap();

    assert_eq!(id_file.get_offset(a).unwrap(), 4);
    assert_eq!(id_file.get_offset(b).unwrap(), 123_456_789_012);
}

#[test]
fn test_slot_layout_on_disk() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();

    id_file.store_offset(0x0102).unwrap();
    id_file.store_offset(0x0304).unwrap();
    id_file.sync().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[8..16], &0x0102i64.to_be_bytes());
    assert_eq!(&bytes[16..24], &0x0304i64.to_be_bytes());
}

#[test]
fn test_get_unallocated_id_returns_zero() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();
    id_file.store_offset(4).unwrap();

    assert_eq!(id_file.get_offset(2).unwrap(), 0);
    assert_eq!(id_file.get_offset(1_000).unwrap(), 0);
}

#[test]
fn test_set_offset_overwrites_slot() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();
    let id = id_file.store_offset(4).unwrap();

    id_file.set_offset(id, 99).unwrap();

    assert_eq!(id_file.get_offset(id).unwrap(), 99);
    assert_eq!(id_file.max_id(), 1);
}

#[test]
fn test_set_offset_of_unallocated_id_fails() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();

    let result = id_file.set_offset(3, 99);

    assert!(matches!(result, Err(StoreError::Corruption(_))));
}

#[test]
#[should_panic(expected = "id 0 is reserved")]
fn test_get_offset_of_id_zero_panics() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();

    let _ = id_file.get_offset(0);
}

// =============================================================================
// Clear / Reopen Tests
// =============================================================================

#[test]
fn test_clear_resets_max_id() {
    let (_temp, path) = setup_temp_id_file();
    let id_file = IdFile::open(&path, false).unwrap();
    id_file.store_offset(4).unwrap();
    id_file.store_offset(8).unwrap();

    id_file.clear().unwrap();

    assert_eq!(id_file.max_id(), 0);
    assert_eq!(id_file.store_offset(4).unwrap(), 1);
}

#[test]
fn test_reopen_resumes_allocation() {
    let (_temp, path) = setup_temp_id_file();
    {
        let id_file = IdFile::open(&path, true).unwrap();
        id_file.store_offset(4).unwrap();
        id_file.store_offset(12).unwrap();
        id_file.close().unwrap();
    }

    let id_file = IdFile::open(&path, false).unwrap();

    assert_eq!(id_file.max_id(), 2);
    assert_eq!(id_file.get_offset(2).unwrap(), 12);
    assert_eq!(id_file.store_offset(40).unwrap(), 3);
}
