//! Decorators Module
//!
//! Wrappers that each add one cross-cutting behavior to a [`Backend`] while
//! exposing the same contract. [`DecoratorChain`] applies them in a fixed
//! order: each layer wraps the result of the previous one, so the last layer
//! in the list is the first to run on every call.
//!
//! Build order, innermost first:
//!
//! 1. [`SnappyCompression`] (when configured)
//! 2. [`SizeLimit`] (when `max_size_bytes > 0`)
//! 3. [`MetricsLogging`]
//! 4. [`TtlLimit`]

mod compression;
mod metrics;
mod size_limit;
mod ttl_limit;

use std::sync::Arc;

use tracing::info;

pub use compression::SnappyCompression;
pub use metrics::MetricsLogging;
pub use size_limit::SizeLimit;
pub use ttl_limit::TtlLimit;

use crate::backend::BackendHandle;
use crate::config::{CompressionType, Config};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::ttl::resolve_ttl_ceiling;

// == Backend Layer ==
/// One wrapping step of the chain.
#[derive(Clone)]
pub enum BackendLayer {
    Compression(CompressionType),
    SizeLimit(usize),
    Metrics(Arc<Metrics>),
    TtlLimit(u64),
}

impl BackendLayer {
    /// Wraps `inner` with this layer.
    pub fn wrap(&self, inner: BackendHandle) -> BackendHandle {
        match self {
            BackendLayer::Compression(CompressionType::None) => inner,
            BackendLayer::Compression(CompressionType::Snappy) => {
                Arc::new(SnappyCompression::new(inner))
            }
            BackendLayer::SizeLimit(max) => Arc::new(SizeLimit::new(inner, *max)),
            BackendLayer::Metrics(metrics) => Arc::new(MetricsLogging::new(inner, metrics.clone())),
            BackendLayer::TtlLimit(max) => Arc::new(TtlLimit::new(inner, *max)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendLayer::Compression(_) => "compression",
            BackendLayer::SizeLimit(_) => "size_limit",
            BackendLayer::Metrics(_) => "metrics",
            BackendLayer::TtlLimit(_) => "ttl_limit",
        }
    }
}

// == Write Limits ==
/// The TTL and size ceilings the chain enforces, for checking a whole batch
/// before any of it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteLimits {
    /// 0 means unlimited
    pub max_ttl_seconds: u64,
    /// 0 means no size limit
    pub max_size_bytes: usize,
}

impl WriteLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_ttl_seconds: resolve_ttl_ceiling(config),
            max_size_bytes: config.request_limits.max_size_bytes,
        }
    }

    /// Same rule as [`TtlLimit`].
    pub fn effective_ttl(&self, requested: u64) -> Result<u64> {
        ttl_limit::effective_ttl(self.max_ttl_seconds, requested)
    }

    /// Same rule as [`SizeLimit`]; always passes when no size limit is set.
    pub fn check_size(&self, size: usize) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Ok(());
        }
        size_limit::check_size(size, self.max_size_bytes)
    }
}

// == Decorator Chain ==
/// The ordered list of layers applied to the raw backend at startup.
#[derive(Clone)]
pub struct DecoratorChain {
    layers: Vec<BackendLayer>,
}

impl DecoratorChain {
    /// Derives the chain for a configuration.
    ///
    /// Metrics must stay outside compression: it reads the `json`/`xml`/`text`
    /// tag, which compressed bytes no longer carry.
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Self {
        let limits = WriteLimits::from_config(config);
        let mut layers = vec![BackendLayer::Compression(config.compression)];
        if limits.max_size_bytes > 0 {
            layers.push(BackendLayer::SizeLimit(limits.max_size_bytes));
        }
        layers.push(BackendLayer::Metrics(metrics));
        layers.push(BackendLayer::TtlLimit(limits.max_ttl_seconds));

        Self { layers }
    }

    /// Layers in build order, innermost first.
    pub fn layers(&self) -> &[BackendLayer] {
        &self.layers
    }

    /// Wraps the raw backend; the returned handle is the outermost layer.
    pub fn apply(&self, backend: BackendHandle) -> BackendHandle {
        self.layers.iter().fold(backend, |inner, layer| layer.wrap(inner))
    }
}

/// Builds the governed backend the routers share.
pub fn decorate(config: &Config, metrics: Arc<Metrics>, backend: BackendHandle) -> BackendHandle {
    let chain = DecoratorChain::from_config(config, metrics);
    let names: Vec<&str> = chain.layers().iter().map(BackendLayer::name).collect();
    info!("Backend decorators (innermost first): {}", names.join(" -> "));
    chain.apply(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::backend::{Backend, MemoryBackend};
    use crate::config::BackendType;
    use crate::error::CacheError;
    use crate::payload::PayloadType;

    fn names(chain: &DecoratorChain) -> Vec<&'static str> {
        chain.layers().iter().map(BackendLayer::name).collect()
    }

    #[test]
    fn test_chain_order_is_fixed() {
        let chain = DecoratorChain::from_config(&Config::default(), Arc::new(Metrics::new()));
        assert_eq!(
            names(&chain),
            vec!["compression", "size_limit", "metrics", "ttl_limit"]
        );
    }

    #[test]
    fn test_size_limit_skipped_when_unset() {
        let mut config = Config::default();
        config.request_limits.max_size_bytes = 0;
        let chain = DecoratorChain::from_config(&config, Arc::new(Metrics::new()));
        assert_eq!(names(&chain), vec!["compression", "metrics", "ttl_limit"]);
    }

    #[test]
    fn test_ttl_layer_uses_resolved_ceiling() {
        let mut config = Config::default();
        config.request_limits.max_ttl_seconds = 3000;
        config.backend.kind = BackendType::Cassandra;
        let chain = DecoratorChain::from_config(&config, Arc::new(Metrics::new()));

        assert!(matches!(
            chain.layers().last(),
            Some(BackendLayer::TtlLimit(2400))
        ));
    }

    #[tokio::test]
    async fn test_ttl_rejection_reaches_no_inner_layer() {
        let metrics = Arc::new(Metrics::new());
        let raw = Arc::new(RecordingBackend::default());
        let backend = decorate(&Config::default(), metrics.clone(), raw.clone());

        let result = backend.put("k", b"json{}".to_vec(), 3601).await;

        assert!(matches!(result, Err(CacheError::TtlExceeded { .. })));
        assert_eq!(raw.put_count(), 0);
        // Rejected before metrics ran
        assert_eq!(metrics.snapshot().puts.json, 0);
    }

    #[tokio::test]
    async fn test_oversized_write_is_still_measured() {
        let metrics = Arc::new(Metrics::new());
        let raw = Arc::new(RecordingBackend::default());
        let mut config = Config::default();
        config.request_limits.max_size_bytes = 16;
        let backend = decorate(&config, metrics.clone(), raw.clone());

        let payload = PayloadType::Json.encode(br#"{"key":"a long value"}"#);
        let size = payload.len();
        let result = backend.put("k", payload, 60).await;

        assert!(matches!(result, Err(CacheError::PayloadTooLarge { .. })));
        assert_eq!(raw.put_count(), 0);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.puts.json, 1);
        assert_eq!(snapshot.puts.bytes, size as u64);
        assert_eq!(snapshot.puts.bad_requests, 1);
    }

    #[tokio::test]
    async fn test_size_limit_measures_uncompressed_payload() {
        let raw = Arc::new(RecordingBackend::default());
        let mut config = Config::default();
        config.request_limits.max_size_bytes = 100;
        let backend = decorate(&config, Arc::new(Metrics::new()), raw.clone());

        // Compresses far below 100 bytes but is 404 bytes logically
        let payload = PayloadType::Text.encode("a".repeat(400).as_bytes());
        assert!(matches!(
            backend.put("k", payload, 0).await,
            Err(CacheError::PayloadTooLarge { size: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_metrics_see_uncompressed_tag() {
        let metrics = Arc::new(Metrics::new());
        let raw = Arc::new(RecordingBackend::default());
        let backend = decorate(&Config::default(), metrics.clone(), raw.clone());

        backend
            .put("k", PayloadType::Xml.encode(b"<a>b</a>"), 60)
            .await
            .unwrap();

        assert_eq!(metrics.snapshot().puts.xml, 1);
        assert!(!raw.last_put().unwrap().payload.starts_with(b"xml"));
    }

    #[tokio::test]
    async fn test_round_trip_with_and_without_compression() {
        for compression in [CompressionType::None, CompressionType::Snappy] {
            let mut config = Config::default();
            config.compression = compression;
            let backend = decorate(
                &config,
                Arc::new(Metrics::new()),
                Arc::new(MemoryBackend::new(100)),
            );

            let payload = PayloadType::Json.encode(br#"{"ad":"<div>creative</div>"}"#);
            let key = backend.put("rt", payload.clone(), 60).await.unwrap();
            assert_eq!(backend.get(&key).await.unwrap(), payload);
        }
    }

    #[tokio::test]
    async fn test_backend_errors_propagate_through_chain() {
        let backend = decorate(
            &Config::default(),
            Arc::new(Metrics::new()),
            Arc::new(RecordingBackend::failing()),
        );

        assert!(matches!(
            backend.put("k", b"json{}".to_vec(), 10).await,
            Err(CacheError::Unavailable(_))
        ));
        assert!(matches!(
            backend.get("k").await,
            Err(CacheError::Unavailable(_))
        ));
    }

    #[test]
    fn test_write_limits_match_chain() {
        let mut config = Config::default();
        config.request_limits.max_size_bytes = 8;
        let limits = WriteLimits::from_config(&config);

        assert_eq!(limits.effective_ttl(0).unwrap(), 3600);
        assert!(matches!(
            limits.effective_ttl(3601),
            Err(CacheError::TtlExceeded { .. })
        ));
        assert!(limits.check_size(8).is_ok());
        assert!(matches!(
            limits.check_size(9),
            Err(CacheError::PayloadTooLarge { size: 9, limit: 8 })
        ));

        config.request_limits.max_size_bytes = 0;
        assert!(WriteLimits::from_config(&config).check_size(1 << 20).is_ok());
    }
}
