//! Cassandra Engine
//!
//! Stores payloads in a `cache (key text PRIMARY KEY, value blob)` table using
//! lightweight transactions so an existing key is never overwritten.

use std::sync::Arc;

use async_trait::async_trait;
use scylla::{Session, SessionBuilder};
use tracing::info;

use super::Backend;
use crate::config::CassandraConfig;
use crate::error::{CacheError, Result};

const SELECT_QUERY: &str = "SELECT value FROM cache WHERE key = ? LIMIT 1";
const INSERT_QUERY: &str = "INSERT INTO cache (key, value) VALUES (?, ?) IF NOT EXISTS USING TTL ?";

pub struct CassandraBackend {
    session: Arc<Session>,
    default_ttl_seconds: u64,
}

impl CassandraBackend {
    /// Opens a session against the configured hosts and keyspace.
    pub async fn connect(config: &CassandraConfig) -> Result<Self> {
        let session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .build()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        session
            .query_unpaged(format!("USE {}", config.keyspace), ())
            .await?;
        info!(
            "Connected to Cassandra keyspace {} via {}",
            config.keyspace,
            config.hosts.join(",")
        );

        Ok(Self {
            session: Arc::new(session),
            default_ttl_seconds: config.default_ttl_seconds,
        })
    }
}

#[async_trait]
impl Backend for CassandraBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let result = self.session.query_unpaged(SELECT_QUERY, (key,)).await?;

        result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.columns.into_iter().next().flatten())
            .and_then(|value| value.into_blob())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        let ttl = match ttl_seconds {
            0 => self.default_ttl_seconds,
            ttl => ttl,
        };
        let ttl = i32::try_from(ttl).unwrap_or(i32::MAX);

        let result = self
            .session
            .query_unpaged(INSERT_QUERY, (key, payload, ttl))
            .await?;

        // First column of an LWT result is the `[applied]` flag
        let applied = result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.columns.first().cloned().flatten())
            .and_then(|value| value.as_boolean())
            .unwrap_or(true);

        if applied {
            Ok(key.to_string())
        } else {
            Err(CacheError::KeyExists(key.to_string()))
        }
    }
}
