//! In-memory existence cache for tests and development.

use crate::lifecycle::{CacheError, ExistenceCache, LifecycleKey};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory [`ExistenceCache`].
///
/// Tests seed it through [`MemoryExistenceCache::insert`] to simulate the
/// markers the create-path jobs would have written.
#[derive(Clone, Default)]
pub struct MemoryExistenceCache {
    keys: Arc<RwLock<HashSet<String>>>,
}

impl MemoryExistenceCache {
    /// Create new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key as existing
    pub fn insert(&self, key: &LifecycleKey) {
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(key.as_str().to_string());
        }
    }

    /// Remove a key
    pub fn remove(&self, key: &LifecycleKey) {
        if let Ok(mut keys) = self.keys.write() {
            keys.remove(key.as_str());
        }
    }
}

impl std::fmt::Debug for MemoryExistenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryExistenceCache").finish_non_exhaustive()
    }
}

#[async_trait]
impl ExistenceCache for MemoryExistenceCache {
    async fn exists(&self, key: &LifecycleKey) -> Result<bool, CacheError> {
        self.keys
            .read()
            .map(|keys| keys.contains(key.as_str()))
            .map_err(|e| CacheError::Unavailable {
                message: format!("cache lock poisoned: {}", e),
            })
    }
}
