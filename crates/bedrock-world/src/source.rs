//! Where world files come from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::WorldError;

/// Database directory inside a world folder.
pub const DB_DIR: &str = "db";
pub const LEVEL_DAT: &str = "level.dat";

/// A world container: a flat namespace of `/`-separated file names relative
/// to the world root (`level.dat`, `db/000005.ldb`, ...).
pub trait WorldSource {
    fn file_names(&self) -> Result<Vec<String>, WorldError>;

    fn read(&self, name: &str) -> Result<Bytes, WorldError>;

    /// Names under `db/`, in no particular order.
    fn db_files(&self) -> Result<Vec<String>, WorldError> {
        let prefix = format!("{DB_DIR}/");
        Ok(self
            .file_names()?
            .into_iter()
            .filter(|n| n.starts_with(&prefix))
            .collect())
    }
}

/// An unpacked world folder on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn io_error(path: &Path, source: std::io::Error) -> WorldError {
    WorldError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl WorldSource for DirectorySource {
    fn file_names(&self) -> Result<Vec<String>, WorldError> {
        let mut names = Vec::new();
        if self.root.join(LEVEL_DAT).is_file() {
            names.push(LEVEL_DAT.to_string());
        }
        let db = self.root.join(DB_DIR);
        for entry in fs::read_dir(&db).map_err(|e| io_error(&db, e))? {
            let entry = entry.map_err(|e| io_error(&db, e))?;
            if !entry.file_type().map_err(|e| io_error(&db, e))?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(format!("{DB_DIR}/{name}"));
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Bytes, WorldError> {
        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(WorldError::MissingFile(name.to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

/// Files held in memory, for tests and for worlds already extracted from an
/// archive.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, Bytes>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.files.insert(name.into(), data.into());
    }

    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(name, data);
        self
    }
}

impl WorldSource for MemorySource {
    fn file_names(&self) -> Result<Vec<String>, WorldError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, name: &str) -> Result<Bytes, WorldError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| WorldError::MissingFile(name.to_string()))
    }
}
