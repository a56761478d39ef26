//! Backend Module
//!
//! The storage contract every engine and every decorator implements, plus the
//! concrete engines and the factory that picks one from configuration.

mod cassandra;
mod factory;
mod memcache;
pub mod memory;
mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use cassandra::CassandraBackend;
pub use factory::{new_base_backend, BACKEND_INIT_TIMEOUT};
pub use memcache::MemcacheBackend;
pub use memory::MemoryBackend;
pub use redis::RedisBackend;

// == Backend Contract ==
/// A key/value store holding tagged payloads.
///
/// Implementations are shared by every concurrent request, so any locking
/// they need is internal.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetches the payload stored under `key`.
    ///
    /// Returns `CacheError::NotFound` when there is no live record.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Stores `payload` under `key` and returns the key it was stored under.
    ///
    /// A `ttl_seconds` of 0 applies the engine's own default. Writing to a key
    /// that already holds a record returns `CacheError::KeyExists`.
    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String>;
}

/// The single governed backend shared by the whole process.
pub type BackendHandle = Arc<dyn Backend>;

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles for exercising decorators in isolation.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::error::CacheError;

    /// A put as seen by the innermost layer.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedPut {
        pub key: String,
        pub payload: Vec<u8>,
        pub ttl_seconds: u64,
    }

    /// Backend that records every call and can be told to fail.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub gets: AtomicUsize,
        pub puts: Mutex<Vec<RecordedPut>>,
        pub stored: Mutex<Option<Vec<u8>>>,
        pub fail_with_unavailable: bool,
    }

    impl RecordingBackend {
        pub fn failing() -> Self {
            Self {
                fail_with_unavailable: true,
                ..Self::default()
            }
        }

        pub fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }

        pub fn last_put(&self) -> Option<RecordedPut> {
            self.puts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        async fn get(&self, key: &str) -> Result<Vec<u8>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_with_unavailable {
                return Err(CacheError::Unavailable("connection refused".to_string()));
            }
            self.stored
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CacheError::NotFound(key.to_string()))
        }

        async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
            self.puts.lock().unwrap().push(RecordedPut {
                key: key.to_string(),
                payload: payload.clone(),
                ttl_seconds,
            });
            if self.fail_with_unavailable {
                return Err(CacheError::Unavailable("connection refused".to_string()));
            }
            *self.stored.lock().unwrap() = Some(payload);
            Ok(key.to_string())
        }
    }
}
