//! Range Index Snapshot
//!
//! Immutable on-disk image of a range index: all records in ascending order.
//! A new snapshot is written to a temporary file and renamed over the old
//! one, so a reader always sees either the previous or the next image.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                       │
//! │   Magic: "nbt" (3) | Version: u8 (1)                    │
//! │   RecordSize: u32 BE (4) | RecordCount: u64 BE (8)      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Records (RecordCount * RecordSize bytes, ascending)     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   RecordsCRC: u32 BE                                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::header::HeaderFormat;

/// Magic number "Native B-Tree"
pub const MAGIC_NUMBER: [u8; 3] = *b"nbt";

/// Current snapshot format version
pub const FILE_FORMAT_VERSION: u8 = 1;

/// Header size: Magic (3) + Version (1) + RecordSize (4) + RecordCount (8)
pub const HEADER_LENGTH: u64 = 16;

/// Footer size: CRC32 (4)
pub const FOOTER_LENGTH: u64 = 4;

/// Byte offset of the record count inside the header
const RECORD_COUNT_OFFSET: u64 = 8;

const HEADER: HeaderFormat = HeaderFormat {
    magic: MAGIC_NUMBER,
    current_version: FILE_FORMAT_VERSION,
    min_version: 1,
    length: HEADER_LENGTH,
};

// =============================================================================
// SnapshotWriter
// =============================================================================

/// Writes a new snapshot from records supplied in ascending order
pub struct SnapshotWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    writer: BufWriter<File>,
    record_size: usize,
    record_count: u64,
    last_record: Option<Vec<u8>>,
    hasher: crc32fast::Hasher,
}

impl SnapshotWriter {
    /// Start a snapshot that will replace `path` on `finish()`
    pub fn create(path: &Path, record_size: usize) -> Result<Self> {
        let record_size_field = u32::try_from(record_size)
            .map_err(|_| StoreError::Config(format!("record size {} too large", record_size)))?;

        let tmp_path = tmp_path_for(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&MAGIC_NUMBER)?;
        writer.write_all(&[FILE_FORMAT_VERSION])?;
        writer.write_all(&record_size_field.to_be_bytes())?;
        writer.write_all(&0u64.to_be_bytes())?; // Placeholder for record count

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer,
            record_size,
            record_count: 0,
            last_record: None,
            hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a record (must be strictly greater than the previous one)
    pub fn add(&mut self, record: &[u8]) -> Result<()> {
        super::check_record(record, self.record_size)?;

        if let Some(last) = &self.last_record {
            if record <= last.as_slice() {
                return Err(StoreError::Corruption(
                    "snapshot records must be added in ascending order".to_string(),
                ));
            }
        }

        self.writer.write_all(record)?;
        self.hasher.update(record);
        self.record_count += 1;
        self.last_record = Some(record.to_vec());
        Ok(())
    }

    /// Write the footer, make the file durable and move it into place
    pub fn finish(mut self) -> Result<u64> {
        let crc = self.hasher.finalize();
        self.writer.write_all(&crc.to_be_bytes())?;
        self.writer.flush()?;

        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        file.seek(SeekFrom::Start(RECORD_COUNT_OFFSET))?;
        file.write_all(&self.record_count.to_be_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path)?;
        Ok(self.record_count)
    }
}

/// `values.hash` → `values.hash.tmp`
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}

// =============================================================================
// SnapshotReader
// =============================================================================

/// Loads and validates a snapshot
pub struct SnapshotReader {
    record_size: usize,
    data: Vec<u8>,
}

impl SnapshotReader {
    /// Open a snapshot, checking header, length and checksum
    pub fn open(path: &Path, record_size: usize) -> Result<Self> {
        let mut file = File::open(path)?;
        HEADER.validate(&mut file, path)?;

        let mut fields = [0u8; 12];
        file.seek(SeekFrom::Start(4))?;
        file.read_exact(&mut fields)?;

        let mut size_bytes = [0u8; 4];
        let mut count_bytes = [0u8; 8];
        size_bytes.copy_from_slice(&fields[0..4]);
        count_bytes.copy_from_slice(&fields[4..12]);
        let stored_size = u32::from_be_bytes(size_bytes) as usize;
        let record_count = u64::from_be_bytes(count_bytes);

        if stored_size != record_size {
            return Err(StoreError::InvalidRecord {
                expected: record_size,
                actual: stored_size,
            });
        }

        let file_len = file.metadata()?.len();
        let expected_len = record_count
            .checked_mul(record_size as u64)
            .and_then(|n| n.checked_add(HEADER_LENGTH + FOOTER_LENGTH));
        if expected_len != Some(file_len) {
            return Err(StoreError::Corruption(format!(
                "{}: {} records of {} bytes do not match file length {}",
                path.display(),
                record_count,
                record_size,
                file_len
            )));
        }

        let mut data = vec![0u8; (record_count * record_size as u64) as usize];
        file.read_exact(&mut data)?;

        let mut crc_bytes = [0u8; 4];
        file.read_exact(&mut crc_bytes)?;
        let stored_crc = u32::from_be_bytes(crc_bytes);
        let actual_crc = crc32fast::hash(&data);
        if stored_crc != actual_crc {
            return Err(StoreError::Corruption(format!(
                "{}: snapshot checksum mismatch",
                path.display()
            )));
        }

        Ok(Self { record_size, data })
    }

    /// Number of records in the snapshot
    pub fn record_count(&self) -> u64 {
        if self.record_size == 0 {
            return 0;
        }
        (self.data.len() / self.record_size) as u64
    }

    /// Records in file order
    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.record_size.max(1))
    }

    /// Collect the records into an ordered set
    pub fn into_set(self) -> BTreeSet<Vec<u8>> {
        self.records().map(|r| r.to_vec()).collect()
    }
}
