//! Tests for the data file
//!
//! These tests verify:
//! - Appending and reading back blobs by offset
//! - Header creation and validation
//! - Clear and reopen behaviour
//! - Sequential iteration over all records

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use valuestore::datafile::{DataFile, HEADER_LENGTH};
use valuestore::StoreError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_data_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("values.dat");
    (temp_dir, path)
}

// =============================================================================
// Open / Header Tests
// =============================================================================

#[test]
fn test_open_writes_header() {
    let (_temp, path) = setup_temp_data_file();

    let data_file = DataFile::open(&path, false).unwrap();

    assert_eq!(data_file.file_size(), HEADER_LENGTH);
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes, b"ndf\x01");
}

#[test]
fn test_open_rejects_wrong_magic() {
    let (_temp, path) = setup_temp_data_file();
    fs::write(&path, b"xyz\x01").unwrap();

    let result = DataFile::open(&path, false);

    assert!(matches!(result, Err(StoreError::InvalidMagic { .. })));
}

#[test]
fn test_open_rejects_newer_version() {
    let (_temp, path) = setup_temp_data_file();
    fs::write(&path, b"ndf\x02").unwrap();

    let result = DataFile::open(&path, false);

    assert!(matches!(
        result,
        Err(StoreError::UnsupportedVersion { found: 2, .. })
    ));
}

#[test]
fn test_open_rejects_version_below_minimum() {
    let (_temp, path) = setup_temp_data_file();
    fs::write(&path, b"ndf\x00").unwrap();

    let result = DataFile::open(&path, false);

    assert!(matches!(
        result,
        Err(StoreError::UnsupportedVersion { found: 0, min: 1, .. })
    ));
}

#[test]
fn test_open_rejects_truncated_header() {
    let (_temp, path) = setup_temp_data_file();
    fs::write(&path, b"nd").unwrap();

    let result = DataFile::open(&path, false);

    assert!(matches!(result, Err(StoreError::TruncatedHeader { .. })));
}

// =============================================================================
// Store / Get Tests
// =============================================================================

#[test]
fn test_first_record_follows_header() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();

    let offset = data_file.store_data(b"hello").unwrap();

    assert_eq!(offset, HEADER_LENGTH);
    assert_eq!(data_file.file_size(), HEADER_LENGTH + 4 + 5);
}

#[test]
fn test_store_and_get() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();

    let first = data_file.store_data(b"first").unwrap();
    let second = data_file.store_data(b"second value").unwrap();

    assert_ne!(first, second);
    assert_eq!(data_file.get_data(first).unwrap(), b"first");
    assert_eq!(data_file.get_data(second).unwrap(), b"second value");
}

#[test]
fn test_record_layout_is_big_endian_length_prefix() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();

    data_file.store_data(b"abc").unwrap();
    data_file.sync().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[4..8], &[0, 0, 0, 3]);
    assert_eq!(&bytes[8..], b"abc");
}

#[test]
fn test_store_empty_blob() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();

    let offset = data_file.store_data(b"").unwrap();
    let after = data_file.store_data(b"x").unwrap();

    assert_eq!(data_file.get_data(offset).unwrap(), Vec::<u8>::new());
    assert_eq!(after, offset + 4);
}

#[test]
fn test_store_large_blob() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();
    let large = vec![b'a'; 66_000];

    let offset = data_file.store_data(&large).unwrap();

    assert_eq!(data_file.get_data(offset).unwrap(), large);
}

#[test]
fn test_get_past_end_is_corruption() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();
    data_file.store_data(b"abc").unwrap();

    let result = data_file.get_data(1_000);

    assert!(matches!(result, Err(StoreError::Corruption(_))));
}

#[test]
#[should_panic(expected = "inside the file header")]
fn test_get_offset_zero_panics() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();

    let _ = data_file.get_data(0);
}

// =============================================================================
// Clear / Reopen Tests
// =============================================================================

#[test]
fn test_clear_keeps_header_only() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();
    data_file.store_data(b"one").unwrap();
    data_file.store_data(b"two").unwrap();

    data_file.clear().unwrap();

    assert_eq!(data_file.file_size(), HEADER_LENGTH);
    assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_LENGTH);
    assert_eq!(data_file.store_data(b"three").unwrap(), HEADER_LENGTH);
}

#[test]
fn test_reopen_preserves_records() {
    let (_temp, path) = setup_temp_data_file();

    let offset = {
        let data_file = DataFile::open(&path, true).unwrap();
        let offset = data_file.store_data(b"persistent").unwrap();
        data_file.close().unwrap();
        offset
    };

    let data_file = DataFile::open(&path, false).unwrap();
    assert_eq!(data_file.get_data(offset).unwrap(), b"persistent");

    // Appends continue after the existing records
    let next = data_file.store_data(b"more").unwrap();
    assert_eq!(next, offset + 4 + 10);
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iter_empty_file() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();

    assert_eq!(data_file.iter().unwrap().count(), 0);
}

#[test]
fn test_iter_returns_records_in_storage_order() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();

    let values: Vec<Vec<u8>> = (0..20).map(|i| format!("value{}", i).into_bytes()).collect();
    let offsets: Vec<u64> = values
        .iter()
        .map(|v| data_file.store_data(v).unwrap())
        .collect();

    let records: Vec<(u64, Vec<u8>)> = data_file.iter().unwrap().map(|r| r.unwrap()).collect();

    assert_eq!(records.len(), 20);
    for (i, (offset, data)) in records.iter().enumerate() {
        assert_eq!(*offset, offsets[i]);
        assert_eq!(data, &values[i]);
    }
}

#[test]
fn test_iter_stops_at_creation_time_end() {
    let (_temp, path) = setup_temp_data_file();
    let data_file = DataFile::open(&path, false).unwrap();
    data_file.store_data(b"before").unwrap();

    let iter = data_file.iter().unwrap();
    data_file.store_data(b"after").unwrap();

    let records: Vec<_> = iter.map(|r| r.unwrap().1).collect();
    assert_eq!(records, vec![b"before".to_vec()]);
}

#[test]
fn test_iter_reports_truncated_tail() {
    let (_temp, path) = setup_temp_data_file();
    {
        let data_file = DataFile::open(&path, false).unwrap();
        data_file.store_data(b"good").unwrap();
        data_file.close().unwrap();
    }

    // Length prefix claiming more bytes than follow
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0, 0, 0, 50, b'x']).unwrap();
    drop(file);

    let data_file = DataFile::open(&path, false).unwrap();
    let mut iter = data_file.iter().unwrap();

    assert_eq!(iter.next().unwrap().unwrap().1, b"good");
    assert!(matches!(iter.next(), Some(Err(StoreError::Corruption(_)))));
    assert!(iter.next().is_none());
}
