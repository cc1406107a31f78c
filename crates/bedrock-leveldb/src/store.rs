//! The merged key-value view over every table and log file of a database.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use bedrock_codec::LoadError;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::DbError;
use crate::log::{parse_batch, read_log_records};
use crate::table::read_table;

/// Where the winning entry for a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Table,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// `None` marks a tombstone.
    pub value: Option<Bytes>,
    pub sequence: u64,
    pub origin: Origin,
}

impl StoreEntry {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// Result of looking a key up, keeping deletions distinct from absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Present(&'a Bytes),
    Deleted,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DbFileKind {
    Table,
    Log,
}

/// Classify a database file by extension and parse its file number.
///
/// Returns `None` for files that hold no records (`MANIFEST-*`, `CURRENT`, ...).
pub fn classify_file(name: &str) -> Option<(DbFileKind, Option<u64>)> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    let kind = match ext.to_ascii_lowercase().as_str() {
        "ldb" | "sst" => DbFileKind::Table,
        "log" => DbFileKind::Log,
        _ => return None,
    };
    Some((kind, stem.parse().ok()))
}

#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: BTreeMap<Vec<u8>, StoreEntry>,
    errors: Vec<LoadError>,
    files_loaded: usize,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every table and then every log, each in ascending file number.
    ///
    /// A file that fails to parse contributes nothing; its error is collected
    /// and the remaining files still load. Names that are neither tables nor
    /// logs are ignored.
    pub fn init<I, N>(&mut self, files: I)
    where
        I: IntoIterator<Item = (N, Bytes)>,
        N: Into<String>,
    {
        let mut ordered: Vec<(DbFileKind, u64, String, Bytes)> = files
            .into_iter()
            .filter_map(|(name, data)| {
                let name = name.into();
                let (kind, number) = classify_file(&name)?;
                Some((kind, number.unwrap_or(u64::MAX), name, data))
            })
            .collect();
        ordered.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));

        for (kind, _, name, data) in ordered {
            let result = match kind {
                DbFileKind::Table => self.load_table(&name, &data),
                DbFileKind::Log => self.load_log(&name, &data),
            };
            if let Err(e) = result {
                self.record_error(&name, &e);
            }
        }
        debug!(
            keys = self.entries.len(),
            files = self.files_loaded,
            errors = self.errors.len(),
            "key-value store loaded"
        );
    }

    /// Merge one table. For a key already present from another table, the
    /// entry with the higher sequence number wins; log entries are never
    /// replaced by table entries.
    pub fn load_table(&mut self, name: &str, data: &Bytes) -> Result<usize, DbError> {
        let table = read_table(data)?;
        let count = table.len();
        for entry in table {
            let incoming = StoreEntry {
                value: entry.value,
                sequence: entry.sequence,
                origin: Origin::Table,
            };
            match self.entries.entry(entry.key) {
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get();
                    if current.origin == Origin::Table && current.sequence <= incoming.sequence {
                        slot.insert(incoming);
                    }
                }
            }
        }
        self.files_loaded += 1;
        debug!(file = name, records = count, "loaded table");
        Ok(count)
    }

    /// Apply one log. Entries overwrite or tombstone whatever is stored, in
    /// file order.
    pub fn load_log(&mut self, name: &str, data: &[u8]) -> Result<usize, DbError> {
        let batches = read_log_records(data)?
            .iter()
            .map(|record| parse_batch(record))
            .collect::<Result<Vec<_>, _>>()?;

        let mut count = 0;
        for batch in batches {
            for (i, entry) in batch.entries.into_iter().enumerate() {
                self.entries.insert(
                    entry.key.to_vec(),
                    StoreEntry {
                        value: entry.value,
                        sequence: batch.sequence.wrapping_add(i as u64),
                        origin: Origin::Log,
                    },
                );
                count += 1;
            }
        }
        self.files_loaded += 1;
        debug!(file = name, entries = count, "applied log");
        Ok(count)
    }

    fn record_error(&mut self, name: &str, error: &DbError) {
        warn!(file = name, %error, "skipping unreadable database file");
        self.errors
            .push(LoadError::new(name, error.kind(), error.to_string()));
    }

    pub fn lookup(&self, key: &[u8]) -> Lookup<'_> {
        match self.entries.get(key) {
            Some(StoreEntry {
                value: Some(value), ..
            }) => Lookup::Present(value),
            Some(_) => Lookup::Deleted,
            None => Lookup::Missing,
        }
    }

    /// The live value for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.entries.get(key).and_then(|e| e.value.as_ref())
    }

    pub fn entry(&self, key: &[u8]) -> Option<&StoreEntry> {
        self.entries.get(key)
    }

    /// Every key, tombstones included, in byte order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &StoreEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tombstone_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_tombstone()).count()
    }

    pub fn files_loaded(&self) -> usize {
        self.files_loaded
    }

    pub fn errors(&self) -> &[LoadError] {
        &self.errors
    }

    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }
}
