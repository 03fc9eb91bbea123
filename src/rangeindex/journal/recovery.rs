//! Journal Recovery
//!
//! Reads back the journal after a restart or crash.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::warn;

use crate::error::{Result, StoreError};

use super::{JournalEntry, JournalReader};

/// Handles journal recovery after a crash
pub struct JournalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries encountered (recovery stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN, `0` if none
    pub last_lsn: u64,

    /// Whether anything after the last valid entry was (or would be) cut off
    pub was_truncated: bool,
}

impl JournalRecovery {
    /// Recover entries from a journal file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first corrupted or partial entry
    /// 3. Truncate the file after the last valid entry
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<JournalEntry>, RecoveryResult)> {
        let (entries, result, valid_end) = Self::scan(path)?;

        if result.was_truncated {
            warn!(
                path = %path.display(),
                valid_end,
                corrupted = result.entries_corrupted,
                "truncating journal after last valid entry"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_end)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a journal file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<JournalEntry>, RecoveryResult, u64)> {
        let file_len = std::fs::metadata(path)?.len();
        let mut reader = JournalReader::open(path)?;

        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(StoreError::JournalCorruption(_)) | Err(StoreError::Serialization(_)) => {
                    result.entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let valid_end = reader.position();
        result.was_truncated = valid_end < file_len;

        Ok((entries, result, valid_end))
    }
}
