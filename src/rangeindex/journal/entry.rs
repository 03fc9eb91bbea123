//! Journal Entry definitions
//!
//! Defines the structure and framing of individual journal entries.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Entry header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The mutation to replay
    pub op: JournalOp,
}

/// Mutations that can be journaled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalOp {
    /// Insert a record
    Insert { record: Vec<u8> },

    /// Remove a record
    Remove { record: Vec<u8> },
}

impl JournalEntry {
    pub fn new(lsn: u64, op: JournalOp) -> Self {
        Self { lsn, op }
    }

    /// Encode into `[lsn][crc][len][data]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = self.encode_op()?;
        let crc = crc32fast::hash(&data);
        let len = u32::try_from(data.len())
            .map_err(|_| StoreError::Serialization("journal entry too large".to_string()))?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Decode a complete framed entry, verifying its CRC
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(StoreError::JournalCorruption(format!(
                "entry header truncated: {} bytes",
                bytes.len()
            )));
        }

        let (lsn, crc, len) = parse_header(&bytes[..HEADER_SIZE]);
        let data = &bytes[HEADER_SIZE..];
        if data.len() != len as usize {
            return Err(StoreError::JournalCorruption(format!(
                "entry {} expects {} data bytes, found {}",
                lsn,
                len,
                data.len()
            )));
        }

        Self::from_parts(lsn, crc, data)
    }

    /// Build an entry from an already split header and data section
    pub(crate) fn from_parts(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(data);
        if actual != crc {
            return Err(StoreError::JournalCorruption(format!(
                "CRC mismatch in entry {}: stored {:#010x}, computed {:#010x}",
                lsn, crc, actual
            )));
        }

        let op = bincode::deserialize(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self { lsn, op })
    }

    /// CRC of the encoded operation
    pub fn compute_crc(&self) -> Result<u32> {
        Ok(crc32fast::hash(&self.encode_op()?))
    }

    /// Total size of the framed entry
    pub fn serialized_size(&self) -> Result<usize> {
        let data_size = bincode::serialized_size(&self.op)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(HEADER_SIZE + data_size as usize)
    }

    fn encode_op(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.op).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Split a header into `(lsn, crc, len)`
pub(crate) fn parse_header(header: &[u8]) -> (u64, u32, u32) {
    let mut lsn = [0u8; 8];
    let mut crc = [0u8; 4];
    let mut len = [0u8; 4];
    lsn.copy_from_slice(&header[0..8]);
    crc.copy_from_slice(&header[8..12]);
    len.copy_from_slice(&header[12..16]);
    (
        u64::from_le_bytes(lsn),
        u32::from_le_bytes(crc),
        u32::from_le_bytes(len),
    )
}
