//! Configuration for the value store
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Main configuration for a value store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the store files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {prefix}.dat        (data log)
    ///     ├── {prefix}.id         (dense offset index)
    ///     ├── {prefix}.hash       (hash index snapshot)
    ///     └── {prefix}.hash.wal   (hash index journal)
    pub data_dir: PathBuf,

    /// Shared file name prefix for all store files
    pub file_prefix: String,

    /// fsync every file on `sync()` instead of only flushing to the OS
    pub force_sync: bool,

    // -------------------------------------------------------------------------
    // Hash Index Configuration
    // -------------------------------------------------------------------------
    /// How often the hash index journal is fsynced
    pub journal_sync_strategy: JournalSyncStrategy,

    /// Rebuild the hash index on open when it disagrees with the offset index
    pub repair_on_open: bool,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSyncStrategy {
    /// fsync after every journal append (safest, slowest)
    EveryWrite,

    /// fsync after N appended entries
    EveryNEntries { count: usize },

    /// only fsync on an explicit `sync()` of the index
    OnSync,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./valuestore_data"),
            file_prefix: "values".to_string(),
            force_sync: false,
            journal_sync_strategy: JournalSyncStrategy::OnSync,
            repair_on_open: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configured prefix yields usable file names
    pub fn validate(&self) -> Result<()> {
        if self.file_prefix.is_empty() {
            return Err(StoreError::Config("file prefix must not be empty".to_string()));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(StoreError::Config(format!(
                "file prefix must not contain path separators: {:?}",
                self.file_prefix
            )));
        }
        if let JournalSyncStrategy::EveryNEntries { count: 0 } = self.journal_sync_strategy {
            return Err(StoreError::Config(
                "journal sync interval must be at least 1 entry".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the data log
    pub fn data_path(&self) -> PathBuf {
        self.file_with_suffix("dat")
    }

    /// Path of the dense offset index
    pub fn id_path(&self) -> PathBuf {
        self.file_with_suffix("id")
    }

    /// Path of the hash index snapshot
    pub fn hash_path(&self) -> PathBuf {
        self.file_with_suffix("hash")
    }

    /// Path of the hash index journal
    pub fn journal_path(&self) -> PathBuf {
        self.file_with_suffix("hash.wal")
    }

    fn file_with_suffix(&self, suffix: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", self.file_prefix, suffix))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the file name prefix
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// Enable or disable fsync on `sync()`
    pub fn force_sync(mut self, force: bool) -> Self {
        self.config.force_sync = force;
        self
    }

    /// Set the hash index journal sync strategy
    pub fn journal_sync_strategy(mut self, strategy: JournalSyncStrategy) -> Self {
        self.config.journal_sync_strategy = strategy;
        self
    }

    /// Enable or disable hash index repair on open
    pub fn repair_on_open(mut self, repair: bool) -> Self {
        self.config.repair_on_open = repair;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
