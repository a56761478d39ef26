//! In-Memory Engine
//!
//! A process-local map with TTL expiry and LRU capacity eviction. Records are
//! lost on restart.

mod entry;
mod lru;
mod store;


use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

pub use entry::MemoryRecord;
pub use lru::LruTracker;
pub use store::MemoryStore;

use super::Backend;
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::tasks::spawn_cleanup_task;

/// Store shared between the engine and its expiry task.
pub type SharedStore = Arc<RwLock<MemoryStore>>;

// == Memory Backend ==
pub struct MemoryBackend {
    store: SharedStore,
    cleanup: Option<JoinHandle<()>>,
}

impl MemoryBackend {
    /// Creates an engine without a background expiry sweep.
    ///
    /// Expired records are still dropped lazily on read.
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(max_entries))),
            cleanup: None,
        }
    }

    /// Creates an engine and starts its expiry sweep. Must run inside a tokio runtime.
    pub fn from_config(config: &MemoryConfig) -> Self {
        let mut backend = Self::new(config.max_entries);
        if config.cleanup_interval > 0 {
            backend.cleanup = Some(spawn_cleanup_task(
                backend.store.clone(),
                config.cleanup_interval,
            ));
        }
        backend
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        // Write lock: reads update LRU order
        self.store.write().await.get(key)
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        self.store.write().await.insert(key, payload, ttl_seconds)?;
        Ok(key.to_string())
    }
}
