//! # valuestore
//!
//! On-disk deduplicating value store for a native RDF triple store. Turns
//! arbitrary byte values (encoded URIs, literals, blank node labels) into
//! dense `u32` IDs and back:
//! - Equal bytes always map to exactly one ID
//! - IDs are sequential from 1 and survive restarts
//! - O(1) ID → value lookups through a dense offset index
//! - Hash-indexed value → ID lookups with byte-for-byte verification
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        DataStore                             │
//! │          store / get_id / get_data / max_id                  │
//! └───────┬─────────────────────┬──────────────────────┬────────┘
//!         │                     │                      │
//!         ▼                     ▼                      ▼
//!  ┌─────────────┐       ┌─────────────┐        ┌─────────────┐
//!  │  HashIndex  │       │   IdFile    │        │  DataFile   │
//!  │ (hash → id) │       │(id → offset)│        │  (offset →  │
//!  └──────┬──────┘       │   .id       │        │   bytes)    │
//!         │              └─────────────┘        │   .dat      │
//!         ▼                                     └─────────────┘
//!  ┌─────────────────────┐
//!  │  SortedRecordIndex  │
//!  │ .hash + .hash.wal   │
//!  └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
mod header;

pub mod datafile;
pub mod hashindex;
pub mod idfile;
pub mod rangeindex;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, JournalSyncStrategy};
pub use error::{Result, StoreError};
pub use store::{ConsistencyReport, DataStore, StoreStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
