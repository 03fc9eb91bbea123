//! In-memory range index
//!
//! BTreeSet-based index with RwLock for concurrency. Nothing is persisted.

use std::collections::BTreeSet;

use parking_lot::RwLock;

use crate::error::Result;

use super::{check_record, collect_range, RangeIndex, RecordIterator};

/// Volatile range index
pub struct MemoryRangeIndex {
    record_size: usize,
    records: RwLock<BTreeSet<Vec<u8>>>,
}

impl MemoryRangeIndex {
    pub fn new(record_size: usize) -> Self {
        Self {
            record_size,
            records: RwLock::new(BTreeSet::new()),
        }
    }
}

impl RangeIndex for MemoryRangeIndex {
    fn record_size(&self) -> usize {
        self.record_size
    }

    fn insert(&self, record: &[u8]) -> Result<bool> {
        check_record(record, self.record_size)?;
        Ok(self.records.write().insert(record.to_vec()))
    }

    fn remove(&self, record: &[u8]) -> Result<bool> {
        check_record(record, self.record_size)?;
        Ok(self.records.write().remove(record))
    }

    fn iterate_range(&self, min: &[u8], max: &[u8]) -> Result<RecordIterator> {
        check_record(min, self.record_size)?;
        check_record(max, self.record_size)?;
        Ok(collect_range(&self.records.read(), min, max))
    }

    fn len(&self) -> u64 {
        self.records.read().len() as u64
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.records.write().clear();
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
