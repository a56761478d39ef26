//! TTL Limiting Decorator
//!
//! Outermost layer. Writes asking for a TTL above the resolved ceiling are
//! rejected; writes asking for no TTL (0) get the ceiling, so no record
//! outlives it. A ceiling of 0 disables both rules.

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{Backend, BackendHandle};
use crate::error::{CacheError, Result};
use crate::ttl::UNLIMITED;

pub struct TtlLimit {
    inner: BackendHandle,
    max_ttl_seconds: u64,
}

impl TtlLimit {
    pub fn new(inner: BackendHandle, max_ttl_seconds: u64) -> Self {
        Self {
            inner,
            max_ttl_seconds,
        }
    }

    /// The TTL a write will actually be stored with, or the rejection.
    pub fn effective_ttl(&self, requested: u64) -> Result<u64> {
        effective_ttl(self.max_ttl_seconds, requested)
    }
}

/// Applies a TTL ceiling to a requested TTL.
pub fn effective_ttl(max_ttl_seconds: u64, requested: u64) -> Result<u64> {
    match (max_ttl_seconds, requested) {
        (UNLIMITED, requested) => Ok(requested),
        (max, 0) => Ok(max),
        (max, requested) if requested > max => Err(CacheError::TtlExceeded {
            requested,
            limit: max,
        }),
        (_, requested) => Ok(requested),
    }
}

#[async_trait]
impl Backend for TtlLimit {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        let ttl = self.effective_ttl(ttl_seconds).inspect_err(|_| {
            debug!(
                requested = ttl_seconds,
                limit = self.max_ttl_seconds,
                "Rejecting write above TTL ceiling"
            );
        })?;
        self.inner.put(key, payload, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ttl_above_ceiling_never_reaches_storage() {
        let raw = Arc::new(RecordingBackend::default());
        let backend = TtlLimit::new(raw.clone(), 2400);

        let result = backend.put("k", b"json{}".to_vec(), 2401).await;

        assert!(matches!(
            result,
            Err(CacheError::TtlExceeded {
                requested: 2401,
                limit: 2400
            })
        ));
        assert_eq!(raw.put_count(), 0);
    }

    #[tokio::test]
    async fn test_ttl_within_ceiling_is_kept() {
        let raw = Arc::new(RecordingBackend::default());
        let backend = TtlLimit::new(raw.clone(), 2400);

        backend.put("k", b"json{}".to_vec(), 2400).await.unwrap();
        assert_eq!(raw.last_put().unwrap().ttl_seconds, 2400);

        backend.put("k", b"json{}".to_vec(), 30).await.unwrap();
        assert_eq!(raw.last_put().unwrap().ttl_seconds, 30);
    }

    #[tokio::test]
    async fn test_zero_ttl_gets_ceiling() {
        let raw = Arc::new(RecordingBackend::default());
        let backend = TtlLimit::new(raw.clone(), 600);

        backend.put("k", b"json{}".to_vec(), 0).await.unwrap();
        assert_eq!(raw.last_put().unwrap().ttl_seconds, 600);
    }

    #[tokio::test]
    async fn test_unlimited_ceiling_passes_everything() {
        let raw = Arc::new(RecordingBackend::default());
        let backend = TtlLimit::new(raw.clone(), UNLIMITED);

        backend.put("k", b"json{}".to_vec(), 0).await.unwrap();
        assert_eq!(raw.last_put().unwrap().ttl_seconds, 0);
        backend.put("k", b"json{}".to_vec(), 1_000_000).await.unwrap();
        assert_eq!(raw.last_put().unwrap().ttl_seconds, 1_000_000);
    }
}
