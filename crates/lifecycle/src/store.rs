//! Persistence of intermediate records, one collection per staker key.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;
use stakeline_primitives::IntermediateDelegation;

use crate::errors::StoreError;

/// Key/value storage of intermediate record collections. Collections are always replaced
/// whole.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait IntermediateStore: Send + Sync {
    /// Returns the stored collection, or an empty one if nothing was stored under `key`.
    fn load(&self, key: &str) -> Result<Vec<IntermediateDelegation>, StoreError>;

    fn store(&self, key: &str, records: &[IntermediateDelegation]) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryIntermediateStore {
    entries: RwLock<HashMap<String, Vec<IntermediateDelegation>>>,
}

impl MemoryIntermediateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntermediateStore for MemoryIntermediateStore {
    fn load(&self, key: &str) -> Result<Vec<IntermediateDelegation>, StoreError> {
        Ok(self.entries.read().get(key).cloned().unwrap_or_default())
    }

    fn store(&self, key: &str, records: &[IntermediateDelegation]) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_owned(), records.to_vec());
        Ok(())
    }
}

/// Stores each collection as `<key>.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileIntermediateStore {
    directory: PathBuf,
}

impl FileIntermediateStore {
    /// Opens the store, creating `directory` if needed.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }
}

impl IntermediateStore for FileIntermediateStore {
    fn load(&self, key: &str) -> Result<Vec<IntermediateDelegation>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, records: &[IntermediateDelegation]) -> Result<(), StoreError> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
