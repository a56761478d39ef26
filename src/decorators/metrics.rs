//! Metrics Logging Decorator
//!
//! Records payload type, size and latency. Sits outside size limiting and
//! compression: the type is read from the payload's leading tag, which
//! compression would destroy, and rejected writes must still be counted.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::{Backend, BackendHandle};
use crate::error::{CacheError, Result};
use crate::metrics::Metrics;
use crate::payload::PayloadType;

pub struct MetricsLogging {
    inner: BackendHandle,
    metrics: Arc<Metrics>,
}

impl MetricsLogging {
    pub fn new(inner: BackendHandle, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl Backend for MetricsLogging {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let result = self.inner.get(key).await;

        match &result {
            Ok(_) => self.metrics.record_get_hit(start.elapsed()),
            Err(CacheError::NotFound(_)) => self.metrics.record_get_miss(),
            Err(err) => {
                warn!(key = %key, error = %err, "Backend read failed");
                self.metrics.record_get_error();
            }
        }
        result
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        let kind = PayloadType::detect(&payload);
        self.metrics.record_put_payload(kind, payload.len());

        let start = Instant::now();
        let result = self.inner.put(key, payload, ttl_seconds).await;

        match &result {
            Ok(_) => {
                let elapsed = start.elapsed();
                debug!(key = %key, ttl_seconds, elapsed_us = elapsed.as_micros() as u64, "Stored record");
                self.metrics.record_put_success(elapsed);
            }
            Err(err) if err.is_validation() => self.metrics.record_put_bad_request(),
            Err(CacheError::KeyExists(_)) => self.metrics.record_put_bad_request(),
            Err(err) => {
                warn!(key = %key, error = %err, "Backend write failed");
                self.metrics.record_put_error();
            }
        }
        result
    }
}
