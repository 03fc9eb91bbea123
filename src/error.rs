//! Error types for the value store
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for value store operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // File Format Errors (fatal at open time)
    // -------------------------------------------------------------------------
    #[error("{}: file doesn't contain compatible data (bad magic number)", path.display())]
    InvalidMagic { path: PathBuf },

    #[error(
        "{}: unsupported file format version {found} (supported: {min}..={max})",
        path.display()
    )]
    UnsupportedVersion {
        path: PathBuf,
        found: u8,
        min: u8,
        max: u8,
    },

    #[error("{}: file too short to hold a valid header", path.display())]
    TruncatedHeader { path: PathBuf },

    // -------------------------------------------------------------------------
    // Corruption Errors
    // -------------------------------------------------------------------------
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Journal corruption detected: {0}")]
    JournalCorruption(String),

    // -------------------------------------------------------------------------
    // Range Index Errors
    // -------------------------------------------------------------------------
    #[error("Invalid record: expected {expected} bytes, got {actual}")]
    InvalidRecord { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("ID space exhausted: no more 32-bit IDs can be assigned")]
    IdSpaceExhausted,

    #[error("Value too large: {0} bytes does not fit a 32-bit length prefix")]
    ValueTooLarge(usize),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
