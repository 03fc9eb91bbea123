//! Journal Reader
//!
//! Handles reading entries from the journal file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;

use super::entry::{parse_header, HEADER_SIZE};
use super::JournalEntry;

/// Reads entries from the journal file
///
/// A partial entry at the end of the file (interrupted append) reads as the
/// end of the journal. A complete entry with a bad CRC is an error.
pub struct JournalReader {
    reader: BufReader<File>,
    /// Offset of the next unread entry
    position: u64,
    file_len: u64,
}

impl JournalReader {
    /// Open a journal file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
        })
    }

    /// Read the next entry from the journal
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>> {
        let remaining = self.file_len - self.position;
        if remaining < HEADER_SIZE as u64 {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header)?;
        let (lsn, crc, len) = parse_header(&header);

        if remaining < (HEADER_SIZE as u64 + len as u64) {
            // Partial write at the tail; leave position at the entry start
            self.file_len = self.position;
            return Ok(None);
        }

        let mut data = vec![0u8; len as usize];
        self.reader.read_exact(&mut data)?;

        let entry = JournalEntry::from_parts(lsn, crc, &data)?;
        self.position += (HEADER_SIZE + data.len()) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last entry returned
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> JournalIterator {
        JournalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over journal entries
pub struct JournalIterator {
    reader: JournalReader,
    done: bool,
}

impl Iterator for JournalIterator {
    type Item = Result<JournalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
