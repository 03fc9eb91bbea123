//! ID File
//!
//! Dense mapping from value IDs to data file offsets. Slot `id` lives at
//! byte `id * 8`, so lookups need no search structure, and the next free
//! slot is always the next ID to hand out.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (8 bytes, occupies slot 0)                       │
//! │   Magic: "nif" (3) | Version: u8 (1) | Padding (4)      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Slot 1: offset i64 BE (8)                               │
//! │ Slot 2: offset i64 BE (8)                               │
//! │ ...                                                     │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::header::HeaderFormat;

// =============================================================================
// Format Constants
// =============================================================================

/// Magic number "Native ID File"
pub const MAGIC_NUMBER: [u8; 3] = *b"nif";

/// Current ID file format version
pub const FILE_FORMAT_VERSION: u8 = 1;

/// Header size: Magic (3) + Version (1) + Padding (4), keeps slots aligned
pub const HEADER_LENGTH: u64 = 8;

/// Size of one offset slot
pub const ITEM_SIZE: u64 = 8;

const HEADER: HeaderFormat = HeaderFormat {
    magic: MAGIC_NUMBER,
    current_version: FILE_FORMAT_VERSION,
    min_version: 1,
    length: HEADER_LENGTH,
};

// =============================================================================
// IdFile
// =============================================================================

struct FileState {
    file: File,
    size: u64,
}

/// Dense ID → offset index
pub struct IdFile {
    path: PathBuf,
    state: Mutex<FileState>,
    force_sync: bool,
}

impl IdFile {
    /// Open or create an ID file
    ///
    /// A trailing partial slot, left behind by an interrupted append, is cut
    /// off so that the file size stays a multiple of the slot size.
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
            debug!(path = %path.display(), "initialized new id file");
        } else {
            HEADER.validate(&mut file, path)?;

            let partial = size % ITEM_SIZE;
            if partial != 0 {
                warn!(
                    path = %path.display(),
                    partial_bytes = partial,
                    "truncating partial trailing slot"
                );
                size -= partial;
                file.set_len(size)?;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(FileState { file, size }),
            force_sync,
        })
    }

    /// Allocate the next ID and point it at `offset`
    pub fn store_offset(&self, offset: u64) -> Result<u32> {
        let mut state = self.state.lock();

        let slot = state.size / ITEM_SIZE;
        let id = u32::try_from(slot).map_err(|_| StoreError::IdSpaceExhausted)?;

        write_slot(&mut state.file, slot, offset)?;
        state.size += ITEM_SIZE;

        Ok(id)
    }

    /// Overwrite the offset of an existing ID
    ///
    /// # Panics
    /// If `id` is `0`.
    pub fn set_offset(&self, id: u32, offset: u64) -> Result<()> {
        assert!(id > 0, "id 0 is reserved");

        let mut state = self.state.lock();
        let slot = id as u64;
        if (slot + 1) * ITEM_SIZE > state.size {
            return Err(StoreError::Corruption(format!(
                "cannot set offset of unallocated id {} in {}",
                id,
                self.path.display()
            )));
        }

        write_slot(&mut state.file, slot, offset)
    }

    /// Look up the offset of an ID; `0` if the ID was never allocated
    ///
    /// # Panics
    /// If `id` is `0`.
    pub fn get_offset(&self, id: u32) -> Result<u64> {
        assert!(id > 0, "id 0 is reserved");

        let mut state = self.state.lock();
        let position = id as u64 * ITEM_SIZE;
        if position + ITEM_SIZE > state.size {
            return Ok(0);
        }

        let mut buf = [0u8; 8];
        state.file.seek(SeekFrom::Start(position))?;
        state.file.read_exact(&mut buf)?;

        let offset = i64::from_be_bytes(buf);
        u64::try_from(offset).map_err(|_| {
            StoreError::Corruption(format!("negative offset {} stored for id {}", offset, id))
        })
    }

    /// Highest allocated ID, `0` when no ID has been allocated
    pub fn max_id(&self) -> u32 {
        let slots = self.state.lock().size / ITEM_SIZE;
        // slot 0 is the header
        (slots - 1) as u32
    }

    /// Drop every slot, keeping only the header
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
}

fn write_slot(file: &mut File, slot: u64, offset: u64) -> Result<()> {
    let value = i64::try_from(offset)
        .map_err(|_| StoreError::Corruption(format!("offset {} exceeds i64 range", offset)))?;
    file.seek(SeekFrom::Start(slot * ITEM_SIZE))?;
    file.write_all(&value.to_be_bytes())?;
    Ok(())
}
