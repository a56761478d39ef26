//! Snappy Compression Decorator
//!
//! Compresses payloads on the way into storage and decompresses them on the
//! way out. Innermost layer, so every other layer sees plain payloads.

use async_trait::async_trait;

use crate::backend::{Backend, BackendHandle};
use crate::error::{CacheError, Result};

pub struct SnappyCompression {
    inner: BackendHandle,
}

impl SnappyCompression {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Backend for SnappyCompression {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let compressed = self.inner.get(key).await?;
        snap::raw::Decoder::new()
            .decompress_vec(&compressed)
            .map_err(|e| CacheError::Corrupted(format!("snappy decode of {}: {}", key, e)))
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        let compressed = snap::raw::Encoder::new()
            .compress_vec(&payload)
            .map_err(|e| CacheError::Internal(format!("snappy encode: {}", e)))?;
        self.inner.put(key, compressed, ttl_seconds).await
    }
}
