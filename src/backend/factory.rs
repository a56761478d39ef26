//! Backend Factory
//!
//! Maps `backend.type` to a constructed engine. This is the only place a
//! backend can fail to exist; any failure here stops startup.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{BackendHandle, CassandraBackend, MemcacheBackend, MemoryBackend, RedisBackend};
use crate::config::{BackendConfig, BackendType};
use crate::error::{CacheError, ConfigError};

/// Upper bound for connecting a network engine at startup.
pub const BACKEND_INIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Builds the raw, undecorated engine selected by configuration.
///
/// # Errors
/// Returns [`ConfigError`] when the engine cannot be built in this process,
/// fails to connect, or takes longer than [`BACKEND_INIT_TIMEOUT`].
pub async fn new_base_backend(config: &BackendConfig) -> Result<BackendHandle, ConfigError> {
    info!("Creating {} backend", config.kind);

    let backend: BackendHandle = match config.kind {
        BackendType::Memory => Arc::new(MemoryBackend::from_config(&config.memory)),
        BackendType::Redis => Arc::new(bounded(RedisBackend::connect(&config.redis)).await?),
        BackendType::Cassandra => {
            Arc::new(bounded(CassandraBackend::connect(&config.cassandra)).await?)
        }
        BackendType::Memcache => {
            Arc::new(bounded(MemcacheBackend::connect(&config.memcache)).await?)
        }
        BackendType::Aerospike => {
            return Err(ConfigError::UnsupportedBackend(config.kind.to_string()))
        }
    };

    Ok(backend)
}

/// Runs a connect future under [`BACKEND_INIT_TIMEOUT`].
async fn bounded<T, F>(connect: F) -> Result<T, ConfigError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    match tokio::time::timeout(BACKEND_INIT_TIMEOUT, connect).await {
        Ok(Ok(backend)) => Ok(backend),
        Ok(Err(err)) => Err(ConfigError::BackendInit(err.to_string())),
        Err(_) => Err(ConfigError::BackendTimeout(
            BACKEND_INIT_TIMEOUT.as_millis() as u64,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemcacheConfig;

    #[tokio::test]
    async fn test_memory_backend_is_built() {
        let backend = new_base_backend(&BackendConfig::default()).await.unwrap();
        backend.put("k", b"text1".to_vec(), 0).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), b"text1");
    }

    #[tokio::test]
    async fn test_aerospike_is_fatal() {
        let config = BackendConfig {
            kind: BackendType::Aerospike,
            ..BackendConfig::default()
        };
        assert!(matches!(
            new_base_backend(&config).await,
            Err(ConfigError::UnsupportedBackend(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_fatal() {
        let config = BackendConfig {
            kind: BackendType::Memcache,
            memcache: MemcacheConfig {
                // Port 1 on loopback refuses connections
                hosts: vec!["127.0.0.1:1".to_string()],
            },
            ..BackendConfig::default()
        };
        assert!(matches!(
            new_base_backend(&config).await,
            Err(ConfigError::BackendInit(_)) | Err(ConfigError::BackendTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_construction_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CacheError>(())
        };
        assert!(matches!(
            bounded(slow).await,
            Err(ConfigError::BackendTimeout(500))
        ));
    }
}
