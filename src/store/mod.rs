//! Identity Store
//!
//! The key-value collaborator that persists identity across process restarts,
//! plus a typed facade over the four fixed keys the beacon uses.

pub mod persistence;

pub use persistence::SledStore;

use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Storage key for the current session identifier
pub const KEY_SESSION_ID: &str = "sessionUUID";
/// Storage key for the per-install client identifier
pub const KEY_CLIENT_ID: &str = "clientId";
/// Storage key for the signed-in account id (written by the host)
pub const KEY_USER_ID: &str = "userId";
/// Storage key for the marketing partner id (written by the host)
pub const KEY_BRAZE_ID: &str = "brazeId";

/// Key-value store interface
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed access to the identity keys.
///
/// Backend failures are logged and degrade to a miss (reads) or a lost write;
/// they never propagate into the dispatch path.
#[derive(Clone)]
pub struct IdentityStore {
    inner: Arc<dyn KeyValueStore>,
}

impl IdentityStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub fn session_id(&self) -> Option<String> {
        self.read(KEY_SESSION_ID)
    }

    pub fn set_session_id(&self, value: &str) {
        self.write(KEY_SESSION_ID, value);
    }

    pub fn client_id(&self) -> Option<String> {
        self.read(KEY_CLIENT_ID)
    }

    pub fn set_client_id(&self, value: &str) {
        self.write(KEY_CLIENT_ID, value);
    }

    pub fn user_id(&self) -> Option<String> {
        self.read(KEY_USER_ID)
    }

    pub fn set_user_id(&self, value: &str) {
        self.write(KEY_USER_ID, value);
    }

    pub fn braze_id(&self) -> Option<String> {
        self.read(KEY_BRAZE_ID)
    }

    pub fn set_braze_id(&self, value: &str) {
        self.write(KEY_BRAZE_ID, value);
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.inner.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Identity store read failed, treating as missing");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.set(key, value) {
            warn!(key, error = %e, "Identity store write failed");
        }
    }
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore").finish_non_exhaustive()
    }
}
