//! Persistence layer for the identity store

use crate::error::StorageError;
use crate::store::KeyValueStore;
use std::path::Path;

const TREE_IDENTITY: &str = "datatag_identity";

/// Sled-based implementation of KeyValueStore
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a store at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::Backend(format!("Failed to open sled database: {}", e))
        })?;
        Self::new(db)
    }

    /// Use an already-open database; identity keys live in their own tree
    pub fn new(db: sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_IDENTITY)?;
        Ok(Self { tree })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.tree.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.tree.get(key.as_bytes())? {
            Some(raw) => {
                let value = String::from_utf8(raw.to_vec()).map_err(|e| {
                    StorageError::IoError(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Stored value for {} is not UTF-8: {}", key, e),
                    ))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        // Identity must survive an abrupt process exit
        self.flush()
    }
}
