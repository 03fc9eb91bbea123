//! Data File Module
//!
//! Append-only log of length-prefixed byte blobs, addressed by file offset.
//! Records are written once and never updated in place.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (4 bytes)                                        │
//! │   Magic: "ndf" (3) | Version: u8 (1)                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Records (variable)                                      │
//! │   [Len: u32 BE][Data]                                   │
//! │   ... repeated for each stored blob ...                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A record is identified by the offset of its length prefix. Offset `0`
//! falls inside the header and therefore never identifies a record.

mod iterator;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::header::HeaderFormat;

pub use iterator::DataFileIterator;

// =============================================================================
// Format Constants
// =============================================================================

/// Magic number "Native Data File"
pub const MAGIC_NUMBER: [u8; 3] = *b"ndf";

/// Current data file format version
pub const FILE_FORMAT_VERSION: u8 = 1;

/// Header size: Magic (3) + Version (1)
pub const HEADER_LENGTH: u64 = 4;

/// Size of the length prefix in front of every record
pub(crate) const LENGTH_PREFIX_SIZE: u64 = 4;

const HEADER: HeaderFormat = HeaderFormat {
    magic: MAGIC_NUMBER,
    current_version: FILE_FORMAT_VERSION,
    min_version: 1,
    length: HEADER_LENGTH,
};

// =============================================================================
// DataFile
// =============================================================================

/// File handle plus the logical end of the log
struct FileState {
    file: File,
    size: u64,
}

/// Append-only data log
///
/// All methods take `&self`; the file handle and its size are guarded by a
/// single mutex so appends and positioned reads never interleave.
pub struct DataFile {
    path: PathBuf,
    state: Mutex<FileState>,
    force_sync: bool,
}

impl DataFile {
    /// Open or create a data file
    ///
    /// An empty file gets a fresh header; an existing one has its header
    /// validated.
    pub fn open(path: &Path, force_sync: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut size = file.metadata()?.len();
        if size == 0 {
            HEADER.write(&mut file)?;
            size = HEADER_LENGTH;
            debug!(path = %path.display(), "initialized new data file");
        } else {
            HEADER.validate(&mut file, path)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(FileState { file, size }),
            force_sync,
        })
    }

    /// Append a blob and return the offset of its length prefix
    pub fn store_data(&self, data: &[u8]) -> Result<u64> {
        let len = u32::try_from(data.len()).map_err(|_| StoreError::ValueTooLarge(data.len()))?;

        let mut record = Vec::with_capacity(LENGTH_PREFIX_SIZE as usize + data.len());
        record.extend_from_slice(&len.to_be_bytes());
        record.extend_from_slice(data);

        let mut state = self.state.lock();
        let offset = state.size;

        state.file.seek(SeekFrom::Start(offset))?;
        state.file.write_all(&record)?;
        state.size += record.len() as u64;

        Ok(offset)
    }

    /// Read the blob whose length prefix starts at `offset`
    ///
    /// # Panics
    /// If `offset` lies inside the header; such offsets are never handed out.
    pub fn get_data(&self, offset: u64) -> Result<Vec<u8>> {
        assert!(
            offset >= HEADER_LENGTH,
            "data offset {} lies inside the file header",
            offset
        );

        let mut state = self.state.lock();
        let size = state.size;

        if offset + LENGTH_PREFIX_SIZE > size {
            return Err(StoreError::Corruption(format!(
                "data offset {} beyond end of {} ({} bytes)",
                offset,
                self.path.display(),
                size
            )));
        }

        let mut len_bytes = [0u8; 4];
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.read_exact(&mut len_bytes)?;
        let len = u32::from_be_bytes(len_bytes) as u64;

        if offset + LENGTH_PREFIX_SIZE + len > size {
            return Err(StoreError::Corruption(format!(
                "record at offset {} claims {} bytes, past end of {}",
                offset,
                len,
                self.path.display()
            )));
        }

        let mut data = vec![0u8; len as usize];
        state.file.read_exact(&mut data)?;

        Ok(data)
    }

    /// Iterate over every stored blob in storage order
    ///
    /// The iterator reads through its own file handle and stops at the end
    /// of the log as it was when the iterator was created.
    pub fn iter(&self) -> Result<DataFileIterator> {
        let end = self.state.lock().size;
        DataFileIterator::new(&self.path, end)
    }

    /// Discard every record, keeping only the header
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.file.set_len(HEADER_LENGTH)?;
        state.size = HEADER_LENGTH;
        Ok(())
    }

    /// Flush pending writes; fsync when configured to
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.file.flush()?;
        if self.force_sync {
            state.file.sync_data()?;
        }
        Ok(())
    }

    /// Close the file, releasing the handle
    pub fn close(self) -> Result<()> {
        let state = self.state.into_inner();
        if self.force_sync {
            state.file.sync_all()?;
        }
        Ok(())
    }

    /// Current size of the log in bytes, header included
    pub fn file_size(&self) -> u64 {
        self.state.lock().size
    }
}
