//! Data File Iterator
//!
//! Sequential iteration over all records in a data file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Result, StoreError};

use super::{HEADER_LENGTH, LENGTH_PREFIX_SIZE};

/// Forward-only iterator over `(offset, data)` pairs in storage order
///
/// Owns a separate read handle, so scanning never moves the cursor used by
/// the data file itself. Once exhausted (or after an error) it stays
/// exhausted.
pub struct DataFileIterator {
    reader: BufReader<File>,
    /// Stop reading when we reach this offset
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
}

impl DataFileIterator {
    pub(super) fn new(path: &Path, end_offset: u64) -> Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(HEADER_LENGTH))?;
        Ok(Self {
            reader: BufReader::new(file),
            end_offset,
            current_offset: HEADER_LENGTH,
        })
    }

    fn read_record(&mut self) -> Result<(u64, Vec<u8>)> {
        let offset = self.current_offset;

        if offset + LENGTH_PREFIX_SIZE > self.end_offset {
            return Err(StoreError::Corruption(format!(
                "truncated length prefix at offset {}",
                offset
            )));
        }

        let mut len_bytes = [0u8; 4];
        self.reader.read_exact(&mut len_bytes)?;
        let len = u32::from_be_bytes(len_bytes) as u64;

        if offset + LENGTH_PREFIX_SIZE + len > self.end_offset {
            return Err(StoreError::Corruption(format!(
                "record at offset {} extends past end of file",
                offset
            )));
        }

        let mut data = vec![0u8; len as usize];
        self.reader.read_exact(&mut data)?;

        self.current_offset += LENGTH_PREFIX_SIZE + len;
        Ok((offset, data))
    }
}

impl Iterator for DataFileIterator {
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_offset >= self.end_offset {
            return None;
        }

        match self.read_record() {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                // Fuse on error
                self.current_offset = self.end_offset;
                Some(Err(e))
            }
        }
    }
}
