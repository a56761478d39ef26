//! Size Limit Decorator
//!
//! Rejects writes whose logical payload (uncompressed, tag included) is larger
//! than `request_limits.max_size_bytes`. Rejected writes never reach storage.

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{Backend, BackendHandle};
use crate::error::{CacheError, Result};

pub struct SizeLimit {
    inner: BackendHandle,
    max_size_bytes: usize,
}

impl SizeLimit {
    pub fn new(inner: BackendHandle, max_size_bytes: usize) -> Self {
        Self {
            inner,
            max_size_bytes,
        }
    }
}

/// Rejects a payload of `size` bytes above `max_size_bytes`.
pub fn check_size(size: usize, max_size_bytes: usize) -> Result<()> {
    if size > max_size_bytes {
        return Err(CacheError::PayloadTooLarge {
            size,
            limit: max_size_bytes,
        });
    }
    Ok(())
}

#[async_trait]
impl Backend for SizeLimit {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        check_size(payload.len(), self.max_size_bytes).inspect_err(|_| {
            debug!(
                size = payload.len(),
                limit = self.max_size_bytes,
                "Rejecting oversized payload"
            );
        })?;
        self.inner.put(key, payload, ttl_seconds).await
    }
}
