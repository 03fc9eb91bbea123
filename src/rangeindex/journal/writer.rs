//! Journal Writer
//!
//! Handles appending entries to the journal file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::JournalSyncStrategy;
use crate::error::{Result, StoreError};

use super::{JournalEntry, JournalOp, JournalRecovery};

/// Writes entries to the journal file
pub struct JournalWriter {
    writer: BufWriter<File>,
    /// LSN assigned to the next appended entry
    next_lsn: u64,
    sync_strategy: JournalSyncStrategy,
    /// Entries appended since the last fsync
    unsynced: usize,
    /// Entries in the file since it was last truncated
    entry_count: u64,
}

impl JournalWriter {
    /// Open or create a journal file for appending
    ///
    /// The file must be clean: a journal with a corrupted or partial tail
    /// has to go through [`JournalRecovery::recover`] first, or new entries
    /// would land behind bytes that replay can never get past.
    pub fn open(path: &Path, sync_strategy: JournalSyncStrategy) -> Result<Self> {
        let (next_lsn, entry_count) = if path.exists() {
            let result = JournalRecovery::verify(path)?;
            if result.was_truncated {
                return Err(StoreError::JournalCorruption(format!(
                    "{} has an unrecovered tail",
                    path.display()
                )));
            }
            (result.last_lsn + 1, result.entries_recovered)
        } else {
            (1, 0)
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            next_lsn,
            sync_strategy,
            unsynced: 0,
            entry_count,
        })
    }

    /// Append an operation, returning its LSN
    ///
    /// The entry is handed to the OS before this returns; whether it is
    /// fsynced depends on the sync strategy.
    pub fn append(&mut self, op: JournalOp) -> Result<u64> {
        let lsn = self.next_lsn;
        let bytes = JournalEntry::new(lsn, op).serialize()?;

        self.writer.write_all(&bytes)?;
        self.writer.flush()?;

        self.next_lsn += 1;
        self.entry_count += 1;
        self.unsynced += 1;

        match self.sync_strategy {
            JournalSyncStrategy::EveryWrite => self.sync()?,
            JournalSyncStrategy::EveryNEntries { count } if self.unsynced >= count => self.sync()?,
            _ => {}
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry; LSNs keep counting up
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().set_len(0)?;
        self.entry_count = 0;
        self.sync()
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Number of entries in the file since the last truncate
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}
