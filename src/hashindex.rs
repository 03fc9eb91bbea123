//! Hash Index
//!
//! Maps a 32-bit content hash to the IDs of all values with that hash, so
//! deduplication only has to compare a handful of candidates instead of
//! scanning the data file.
//!
//! ## Record Format
//! ```text
//! ┌──────────────────┬──────────────────┐
//! │ Hash: u32 BE (4) │ ID: u32 BE (4)   │
//! └──────────────────┴──────────────────┘
//! ```
//!
//! Records sort by raw bytes, so the hash is the primary key and the IDs of
//! one hash come out ascending.

use std::path::Path;

use crate::config::JournalSyncStrategy;
use crate::error::Result;
use crate::rangeindex::{MemoryRangeIndex, RangeIndex, RecordIterator, SortedRecordIndex};

/// Size of a (hash, id) record
pub const ITEM_SIZE: usize = 8;

/// Hash index built on a sorted range index
pub struct HashIndex {
    index: Box<dyn RangeIndex>,
}

impl HashIndex {
    /// Open a persistent hash index
    pub fn open(
        snapshot_path: &Path,
        journal_path: &Path,
        sync_strategy: JournalSyncStrategy,
    ) -> Result<Self> {
        let index = SortedRecordIndex::open(snapshot_path, journal_path, ITEM_SIZE, sync_strategy)?;
        Ok(Self::with_index(Box::new(index)))
    }

    /// Volatile hash index, nothing touches the disk
    pub fn in_memory() -> Self {
        Self::with_index(Box::new(MemoryRangeIndex::new(ITEM_SIZE)))
    }

    /// Build a hash index on any range index with 8-byte records
    ///
    /// # Panics
    /// If the index record size is not 8 bytes.
    pub fn with_index(index: Box<dyn RangeIndex>) -> Self {
        assert_eq!(
            index.record_size(),
            ITEM_SIZE,
            "hash index requires {}-byte records",
            ITEM_SIZE
        );
        Self { index }
    }

    /// Store `id` under `hash`
    pub fn store_id(&self, hash: u32, id: u32) -> Result<()> {
        self.index.insert(&encode(hash, id))?;
        Ok(())
    }

    /// Remove the exact `(hash, id)` entry
    pub fn remove_id(&self, hash: u32, id: u32) -> Result<()> {
        self.index.remove(&encode(hash, id))?;
        Ok(())
    }

    /// IDs stored under `hash`, ascending
    pub fn candidates(&self, hash: u32) -> Result<IdIterator> {
        let records = self
            .index
            .iterate_range(&encode(hash, 0), &encode(hash, u32::MAX))?;
        Ok(IdIterator { records })
    }

    /// Every `(hash, id)` entry in index order
    pub fn entries(&self) -> Result<impl Iterator<Item = (u32, u32)>> {
        let records = self
            .index
            .iterate_range(&encode(0, 0), &encode(u32::MAX, u32::MAX))?;
        Ok(records.map(|record| decode(&record)))
    }

    /// Number of stored entries
    pub fn len(&self) -> u64 {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn sync(&self) -> Result<()> {
        self.index.sync()
    }

    pub fn clear(&self) -> Result<()> {
        self.index.clear()
    }

    pub fn close(self) -> Result<()> {
        self.index.close()
    }
}

/// Iterator over the IDs stored under one hash
///
/// Dropping it releases the underlying range cursor.
pub struct IdIterator {
    records: RecordIterator,
}

impl Iterator for IdIterator {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|record| decode(&record).1)
    }
}

fn encode(hash: u32, id: u32) -> [u8; ITEM_SIZE] {
    let mut record = [0u8; ITEM_SIZE];
    record[0..4].copy_from_slice(&hash.to_be_bytes());
    record[4..8].copy_from_slice(&id.to_be_bytes());
    record
}

fn decode(record: &[u8]) -> (u32, u32) {
    let mut hash = [0u8; 4];
    let mut id = [0u8; 4];
    hash.copy_from_slice(&record[0..4]);
    id.copy_from_slice(&record[4..8]);
    (u32::from_be_bytes(hash), u32::from_be_bytes(id))
}
