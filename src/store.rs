//! Store Module
//!
//! The deduplicating value store that coordinates all file components.
//!
//! ## Responsibilities
//! - Intern values: equal bytes always map to one ID
//! - Resolve IDs back to values
//! - Keep the hash index, ID file and data file consistent
//! - Repair the hash index after an interrupted write

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::datafile::{self, DataFile};
use crate::error::{Result, StoreError};
use crate::hashindex::HashIndex;
use crate::idfile::IdFile;

/// The deduplicating value store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (store/clear/sync/rebuild): Serialized by `write_lock`
///   - The dedup check and the three appends run as one critical section,
///     so two writers can never mint two IDs for equal bytes
///   - Appends go data file → ID file → hash index
///
/// - **Reads** (get_data/get_id): No write_lock needed
///   - A value becomes visible to `get_id` only once its hash entry exists,
///     which is the last step of `store`
///   - A reader may miss a value that is being stored, but never sees a
///     half-written one
pub struct DataStore {
    /// Store configuration
    config: Config,

    /// Content hash → candidate IDs
    hash_index: HashIndex,

    /// ID → data file offset
    id_file: IdFile,

    /// Length-prefixed value bytes
    data_file: DataFile,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

/// Summary numbers for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub max_id: u32,
    pub data_file_size: u64,
    pub hash_entries: u64,
}

/// Result of [`DataStore::verify`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Highest allocated ID
    pub max_id: u32,

    /// Number of hash index entries
    pub hash_entries: u64,

    /// IDs whose offset slot is zero
    pub unset_ids: Vec<u32>,

    /// IDs that `get_id` cannot find because their hash entry is missing
    pub unindexed_ids: Vec<u32>,

    /// Hash entries pointing at an unknown ID or at a value with another hash
    pub dangling_entries: Vec<(u32, u32)>,

    /// `(first, duplicate)` pairs of IDs holding byte-identical values
    pub duplicate_ids: Vec<(u32, u32)>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.unset_ids.is_empty()
            && self.unindexed_ids.is_empty()
            && self.dangling_entries.is_empty()
            && self.duplicate_ids.is_empty()
    }
}

impl DataStore {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open (or initialize) data file, ID file and hash index
    /// 3. Rebuild the hash index if it disagrees with the ID file
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Open the three components
        let data_file = DataFile::open(&config.data_path(), config.force_sync)?;
        let id_file = IdFile::open(&config.id_path(), config.force_sync)?;
        let hash_index = HashIndex::open(
            &config.hash_path(),
            &config.journal_path(),
            config.journal_sync_strategy,
        )?;

        let store = Self {
            config,
            hash_index,
            id_file,
            data_file,
            write_lock: Mutex::new(()),
        };

        // Step 3: An ID without a hash entry means a write was cut short
        // between ID allocation and hash insertion
        let max_id = store.max_id();
        let hash_entries = store.hash_index.len();
        if hash_entries != max_id as u64 {
            if store.config.repair_on_open {
                warn!(max_id, hash_entries, "hash index out of step with id file, rebuilding");
                store.rebuild_hash_index()?;
            } else {
                warn!(max_id, hash_entries, "hash index out of step with id file");
            }
        }

        info!(
            dir = %store.config.data_dir.display(),
            prefix = %store.config.file_prefix,
            max_id,
            "value store opened"
        );

        Ok(store)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get the value stored under `id`
    ///
    /// Returns `None` for ID `0` and for IDs that were never assigned.
    pub fn get_data(&self, id: u32) -> Result<Option<Vec<u8>>> {
        if id == 0 || id > self.id_file.max_id() {
            return Ok(None);
        }

        let offset = self.id_file.get_offset(id)?;
        if offset == 0 {
            return Ok(None);
        }
        if offset < datafile::HEADER_LENGTH {
            return Err(StoreError::Corruption(format!(
                "id {} points into the data file header (offset {})",
                id, offset
            )));
        }

        self.data_file.get_data(offset).map(Some)
    }

    /// Find the ID of a stored value
    pub fn get_id(&self, data: &[u8]) -> Result<Option<u32>> {
        self.lookup(data, hash(data))
    }

    /// Store a value, returning its ID
    ///
    /// Storing bytes that are already present returns the existing ID and
    /// writes nothing.
    pub fn store(&self, data: &[u8]) -> Result<u32> {
        let _write_guard = self.write_lock.lock();

        let hash = hash(data);
        if let Some(id) = self.lookup(data, hash)? {
            return Ok(id);
        }

        // Step 1: Append the bytes
        let offset = self.data_file.store_data(data)?;

        // Step 2: Allocate the next ID for them
        let id = self.id_file.store_offset(offset)?;

        // Step 3: Publish the value for lookups
        self.hash_index.store_id(hash, id)?;

        Ok(id)
    }

    /// Highest assigned ID, `0` for an empty store
    pub fn max_id(&self) -> u32 {
        self.id_file.max_id()
    }

    /// Flush all components, hash index first
    pub fn sync(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        self.hash_index.sync()?;
        self.id_file.sync()?;
        self.data_file.sync()
    }

    /// Remove every value, hash index first
    ///
    /// A clear interrupted halfway leaves the store claiming fewer values,
    /// never claiming values whose bytes are gone.
    pub fn clear(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        self.hash_index.clear()?;
        self.id_file.clear()?;
        self.data_file.clear()?;

        info!(dir = %self.config.data_dir.display(), "value store cleared");
        Ok(())
    }

    /// Close the store gracefully, hash index first
    pub fn close(self) -> Result<()> {
        self.hash_index.close()?;
        self.id_file.close()?;
        self.data_file.close()?;

        debug!(dir = %self.config.data_dir.display(), "value store closed");
        Ok(())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Recreate the hash index from the ID and data files
    ///
    /// Returns the number of entries written.
    pub fn rebuild_hash_index(&self) -> Result<u64> {
        let _write_guard = self.write_lock.lock();

        self.hash_index.clear()?;

        let mut rebuilt = 0u64;
        for id in 1..=self.max_id() {
            match self.get_data(id)? {
                Some(data) => {
                    self.hash_index.store_id(hash(&data), id)?;
                    rebuilt += 1;
                }
                None => warn!(id, "id has no offset, left out of hash index"),
            }
        }

        self.hash_index.sync()?;
        info!(entries = rebuilt, "hash index rebuilt");
        Ok(rebuilt)
    }

    /// Cross-check the three components without modifying anything
    pub fn verify(&self) -> Result<ConsistencyReport> {
        let max_id = self.max_id();
        let mut report = ConsistencyReport {
            max_id,
            hash_entries: self.hash_index.len(),
            ..Default::default()
        };

        // Grouped by the hash of the stored bytes, not by the index
        let mut ids_by_hash: BTreeMap<u32, Vec<u32>> = BTreeMap::new();

        for id in 1..=max_id {
            let Some(data) = self.get_data(id)? else {
                report.unset_ids.push(id);
                continue;
            };

            let value_hash = hash(&data);
            let indexed = self.hash_index.candidates(value_hash)?.any(|c| c == id);
            if !indexed {
                report.unindexed_ids.push(id);
            }
            ids_by_hash.entry(value_hash).or_default().push(id);
        }

        for ids in ids_by_hash.values().filter(|ids| ids.len() > 1) {
            self.find_duplicates(ids, &mut report.duplicate_ids)?;
        }
        report.duplicate_ids.sort_unstable();

        for (entry_hash, id) in self.hash_index.entries()? {
            let matches = match self.get_data(id)? {
                Some(data) => hash(&data) == entry_hash,
                None => false,
            };
            if !matches {
                report.dangling_entries.push((entry_hash, id));
            }
        }

        Ok(report)
    }

    /// Iterate over `(id, value)` for every assigned ID
    pub fn values(&self) -> ValueIterator<'_> {
        ValueIterator {
            store: self,
            next_id: 1,
            max_id: self.max_id(),
        }
    }

    /// Write a human readable listing of the store contents
    pub fn dump(&self, out: &mut dyn Write) -> Result<()> {
        let stats = self.stats();

        writeln!(out)?;
        writeln!(out, "*** value store contents ***")?;
        writeln!(out, "max_id={}", stats.max_id)?;
        writeln!(out, "data_file_size={}", stats.data_file_size)?;
        writeln!(out, "hash_entries={}", stats.hash_entries)?;

        writeln!(out, "---Values---")?;
        for id in 1..=stats.max_id {
            let offset = self.id_file.get_offset(id)?;
            match self.get_data(id)? {
                Some(data) => writeln!(
                    out,
                    "{}: offset={} hash={:08x} len={} {:?}",
                    id,
                    offset,
                    hash(&data),
                    data.len(),
                    String::from_utf8_lossy(&data)
                )?,
                None => writeln!(out, "{}: offset={} <unset>", id, offset)?,
            }
        }

        writeln!(out, "---Hash Index---")?;
        for (entry_hash, id) in self.hash_index.entries()? {
            writeln!(out, "[{:08x},{}]", entry_hash, id)?;
        }

        writeln!(out, "*** end of value store contents ***")?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            max_id: self.max_id(),
            data_file_size: self.data_file.file_size(),
            hash_entries: self.hash_index.len(),
        }
    }

    /// Direct access to the data file (scans, debugging)
    pub fn data_file(&self) -> &DataFile {
        &self.data_file
    }

    /// Direct access to the hash index (repair tests, debugging)
    pub fn hash_index(&self) -> &HashIndex {
        &self.hash_index
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Record every ID in `ids` whose value equals that of an earlier ID
    fn find_duplicates(&self, ids: &[u32], duplicates: &mut Vec<(u32, u32)>) -> Result<()> {
        let mut distinct: Vec<(u32, Vec<u8>)> = Vec::new();
        for &id in ids {
            let Some(data) = self.get_data(id)? else {
                continue;
            };
            match distinct.iter().find(|(_, seen)| *seen == data) {
                Some((first, _)) => duplicates.push((*first, id)),
                None => distinct.push((id, data)),
            }
        }
        Ok(())
    }

    /// Byte-compare every candidate with `hash`; hashes alone prove nothing
    fn lookup(&self, data: &[u8], hash: u32) -> Result<Option<u32>> {
        for id in self.hash_index.candidates(hash)? {
            if let Some(candidate) = self.get_data(id)? {
                if candidate == data {
                    return Ok(Some(id));
                }
            }
        }
        Ok(None)
    }
}

/// Content hash used by the hash index
pub fn hash(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Iterator over every `(id, value)` pair in ID order
pub struct ValueIterator<'a> {
    store: &'a DataStore,
    next_id: u32,
    max_id: u32,
}

impl Iterator for ValueIterator<'_> {
    type Item = Result<(u32, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_id != 0 && self.next_id <= self.max_id {
            let id = self.next_id;
            self.next_id = self.next_id.checked_add(1).unwrap_or(0);

            match self.store.get_data(id) {
                Ok(Some(data)) => return Some(Ok((id, data))),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
