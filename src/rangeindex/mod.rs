//! Range Index Module
//!
//! Ordered storage of fixed-size byte records with inclusive range queries.
//! The hash index is built on top of this contract and is agnostic to the
//! implementation behind it.
//!
//! ## Contract
//! - records are compared by their raw bytes, ascending
//! - `iterate_range(min, max)` yields exactly the records within
//!   `[min, max]`, in ascending order
//! - inserts and removes are visible to the next range query of the same
//!   process
//!
//! ## Implementations
//! - [`SortedRecordIndex`]: persistent; in-memory ordered set, journal of
//!   mutations, sorted snapshot file written on sync
//! - [`MemoryRangeIndex`]: in-memory only, for tests and scratch stores

mod journal;
mod memory;
mod snapshot;
mod sorted;

pub use journal::{
    JournalEntry, JournalIterator, JournalOp, JournalReader, JournalRecovery, JournalWriter,
    RecoveryResult, HEADER_SIZE as JOURNAL_HEADER_SIZE,
};
pub use memory::MemoryRangeIndex;
pub use snapshot::{SnapshotReader, SnapshotWriter};
pub use sorted::SortedRecordIndex;

use std::collections::BTreeSet;
use std::ops::Bound;

use crate::error::{Result, StoreError};

// =============================================================================
// RangeIndex Trait
// =============================================================================

/// Sorted index over fixed-size byte records
pub trait RangeIndex: Send + Sync {
    /// Size in bytes of every record in this index
    fn record_size(&self) -> usize;

    /// Insert a record; returns `false` if it was already present
    fn insert(&self, record: &[u8]) -> Result<bool>;

    /// Remove a record; returns `false` if it was not present
    fn remove(&self, record: &[u8]) -> Result<bool>;

    /// All records within `[min, max]`, ascending
    fn iterate_range(&self, min: &[u8], max: &[u8]) -> Result<RecordIterator>;

    /// Number of records in the index
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make all changes durable
    fn sync(&self) -> Result<()>;

    /// Remove every record
    fn clear(&self) -> Result<()>;

    /// Release the index; it cannot be used afterwards
    fn close(self: Box<Self>) -> Result<()>;
}

// =============================================================================
// RecordIterator
// =============================================================================

/// Forward-only iterator over the records matched by a range query
///
/// Holds its own copy of the matched records, so no lock on the index is
/// kept while it is alive. Dropping it releases the cursor.
#[derive(Debug)]
pub struct RecordIterator {
    records: std::vec::IntoIter<Vec<u8>>,
}

impl RecordIterator {
    pub fn new(records: Vec<Vec<u8>>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for RecordIterator {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Reject records whose size differs from the index record size
pub(crate) fn check_record(record: &[u8], record_size: usize) -> Result<()> {
    if record.len() != record_size {
        return Err(StoreError::InvalidRecord {
            expected: record_size,
            actual: record.len(),
        });
    }
    Ok(())
}

/// Collect the records of `set` within `[min, max]`
pub(crate) fn collect_range(set: &BTreeSet<Vec<u8>>, min: &[u8], max: &[u8]) -> RecordIterator {
    // BTreeSet::range panics on inverted bounds
    if min > max {
        return RecordIterator::empty();
    }

    let records = set
        .range::<[u8], _>((Bound::Included(min), Bound::Included(max)))
        .cloned()
        .collect();
    RecordIterator::new(records)
}
