//! Persistent sorted record index
//!
//! Coordinates the in-memory record set, the journal and the snapshot file.
//!
//! ## Write path
//! 1. Journal the mutation
//! 2. Apply it to the in-memory set
//!
//! ## Sync / checkpoint
//! 1. Write the full set as a new snapshot (temp file + rename)
//! 2. Truncate the journal
//!
//! ## Open
//! 1. Load the snapshot (create an empty one if missing)
//! 2. Recover and replay the journal
//! 3. Checkpoint if anything was replayed

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::JournalSyncStrategy;
use crate::error::Result;

use super::journal::{JournalOp, JournalRecovery, JournalWriter};
use super::snapshot::{SnapshotReader, SnapshotWriter};
use super::{check_record, collect_range, RangeIndex, RecordIterator};

/// Persistent range index
///
/// ## Concurrency:
/// - `records`: RwLock (many concurrent range queries, exclusive mutation)
/// - `journal`: Mutex, also serializes mutations and checkpoints
/// - Lock order is always journal → records
pub struct SortedRecordIndex {
    snapshot_path: PathBuf,
    record_size: usize,
    records: RwLock<BTreeSet<Vec<u8>>>,
    journal: Mutex<JournalWriter>,
}

impl SortedRecordIndex {
    /// Open or create an index stored in `snapshot_path` + `journal_path`
    pub fn open(
        snapshot_path: &Path,
        journal_path: &Path,
        record_size: usize,
        sync_strategy: JournalSyncStrategy,
    ) -> Result<Self> {
        // Step 1: Load the last snapshot
        let snapshot_exists = snapshot_path.exists() && std::fs::metadata(snapshot_path)?.len() > 0;
        let mut records = if snapshot_exists {
            SnapshotReader::open(snapshot_path, record_size)?.into_set()
        } else {
            write_snapshot(snapshot_path, record_size, &BTreeSet::new())?;
            debug!(path = %snapshot_path.display(), "initialized new range index snapshot");
            BTreeSet::new()
        };

        // Step 2: Replay journaled mutations on top of it
        let mut replayed = 0u64;
        if journal_path.exists() {
            let (entries, result) = JournalRecovery::recover(journal_path)?;

            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                info!(
                    path = %journal_path.display(),
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    "range index journal recovery"
                );
            }

            for entry in entries {
                apply(&mut records, entry.op, record_size)?;
                replayed += 1;
            }
        }

        let mut journal = JournalWriter::open(journal_path, sync_strategy)?;

        // Step 3: Fold the replayed entries into a fresh snapshot
        if replayed > 0 {
            write_snapshot(snapshot_path, record_size, &records)?;
            journal.truncate()?;
        }

        Ok(Self {
            snapshot_path: snapshot_path.to_path_buf(),
            record_size,
            records: RwLock::new(records),
            journal: Mutex::new(journal),
        })
    }

    /// Number of journaled mutations not yet covered by the snapshot
    pub fn pending_entries(&self) -> u64 {
        self.journal.lock().entry_count()
    }

    /// Write a snapshot and truncate the journal (journal lock held)
    fn checkpoint(&self, journal: &mut JournalWriter) -> Result<()> {
        {
            let records = self.records.read();
            write_snapshot(&self.snapshot_path, self.record_size, &records)?;
        }
        journal.truncate()
    }
}

impl RangeIndex for SortedRecordIndex {
    fn record_size(&self) -> usize {
        self.record_size
    }

    fn insert(&self, record: &[u8]) -> Result<bool> {
        check_record(record, self.record_size)?;

        let mut journal = self.journal.lock();
        if self.records.read().contains(record) {
            return Ok(false);
        }

        journal.append(JournalOp::Insert {
            record: record.to_vec(),
        })?;
        self.records.write().insert(record.to_vec());
        Ok(true)
    }

    fn remove(&self, record: &[u8]) -> Result<bool> {
        check_record(record, self.record_size)?;

        let mut journal = self.journal.lock();
        if !self.records.read().contains(record) {
            return Ok(false);
        }

        journal.append(JournalOp::Remove {
            record: record.to_vec(),
        })?;
        self.records.write().remove(record);
        Ok(true)
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
        let mut journal = self.journal.lock();
        if journal.entry_count() > 0 {
            self.checkpoint(&mut journal)
        } else {
            journal.sync()
        }
    }

    fn clear(&self) -> Result<()> {
        let mut journal = self.journal.lock();
        self.records.write().clear();
        self.checkpoint(&mut journal)
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.sync()
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

fn apply(records: &mut BTreeSet<Vec<u8>>, op: JournalOp, record_size: usize) -> Result<()> {
    match op {
        JournalOp::Insert { record } => {
            check_record(&record, record_size)?;
            records.insert(record);
        }
        JournalOp::Remove { record } => {
            check_record(&record, record_size)?;
            records.remove(&record);
        }
    }
    Ok(())
}

fn write_snapshot(path: &Path, record_size: usize, records: &BTreeSet<Vec<u8>>) -> Result<()> {
    let mut writer = SnapshotWriter::create(path, record_size)?;
    for record in records {
        writer.add(record)?;
    }
    writer.finish()?;
    Ok(())
}
