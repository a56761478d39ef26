//! Redis Engine
//!
//! Stores payloads with `SET key value NX EX ttl` through a multiplexed
//! connection manager, which is cheap to clone per call and reconnects on its
//! own.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::info;

use super::Backend;
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};

pub struct RedisBackend {
    conn: ConnectionManager,
    /// Applied when a write carries no TTL; 0 means no expiry
    default_ttl_seconds: u64,
}

impl RedisBackend {
    /// Connects to the configured server.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(connection_url(config).as_str())?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis at {}:{}", config.host, config.port);

        Ok(Self {
            conn,
            default_ttl_seconds: config.expiration_minutes.saturating_mul(60),
        })
    }
}

/// Builds the `redis://` or `rediss://` URL for a configuration.
pub fn connection_url(config: &RedisConfig) -> String {
    let scheme = if config.tls_enabled { "rediss" } else { "redis" };
    let auth = if config.password.is_empty() {
        String::new()
    } else {
        format!(":{}@", config.password)
    };
    let insecure = if config.tls_enabled && config.tls_insecure_skip_verify {
        "#insecure"
    } else {
        ""
    };
    format!(
        "{}://{}{}:{}/{}{}",
        scheme, auth, config.host, config.port, config.db, insecure
    )
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        let ttl = match ttl_seconds {
            0 => self.default_ttl_seconds,
            ttl => ttl,
        };

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(payload).arg("NX");
        if ttl > 0 {
            cmd.arg("EX").arg(ttl);
        }

        let mut conn = self.conn.clone();
        let stored: Option<String> = cmd.query_async(&mut conn).await?;
        match stored {
            Some(_) => Ok(key.to_string()),
            None => Err(CacheError::KeyExists(key.to_string())),
        }
    }
}
