#![forbid(unsafe_code)]

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The key-value store prefetched bytes land in.
///
/// Eviction is the backend's own concern; the engine only checks membership
/// before scheduling and writes on fetch completion.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn contains(&self, id: &str) -> bool;
    async fn put(&self, id: &str, bytes: Vec<u8>) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct CacheError {
    pub reason: String,
}

impl CacheError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Plain in-memory cache backend.
///
/// No eviction; suitable for hosts with bounded content sets and for tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Vec<u8>> {
        self.entries.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    async fn put(&self, id: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.entries.write().insert(id.to_string(), bytes);
        Ok(())
    }
}
