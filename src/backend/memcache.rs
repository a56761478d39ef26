//! Memcached Engine
//!
//! Speaks the memcached text protocol over plain TCP. Keys are spread across
//! the configured servers by an FNV-1a hash; each server keeps one connection
//! that is re-established after any I/O failure.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::Backend;
use crate::config::MemcacheConfig;
use crate::error::{CacheError, Result};

/// Longest key memcached accepts.
pub const MAX_KEY_LENGTH: usize = 250;

/// Relative expirations above this are read by memcached as Unix timestamps.
const MAX_RELATIVE_EXPIRATION: u64 = 60 * 60 * 24 * 30;

/// Upper bound for a single request/response exchange.
const OP_TIMEOUT: Duration = Duration::from_secs(2);

type Connection = BufStream<TcpStream>;

struct Server {
    addr: String,
    conn: Mutex<Option<Connection>>,
}

impl Server {
    async fn open(addr: &str) -> Result<Connection> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(BufStream::new(stream))
    }

    /// Runs one exchange, reconnecting first if the last one failed.
    async fn exchange(&self, request: &[u8]) -> Result<Response> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(Self::open(&self.addr).await?);
        }
        let conn = guard
            .as_mut()
            .ok_or_else(|| CacheError::Internal("memcached connection missing".to_string()))?;

        let outcome = tokio::time::timeout(OP_TIMEOUT, roundtrip(conn, request)).await;
        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                *guard = None;
                Err(err)
            }
            Err(_) => {
                *guard = None;
                Err(CacheError::Timeout(format!("memcached {}", self.addr)))
            }
        }
    }
}

/// Parsed server reply.
#[derive(Debug, PartialEq)]
enum Response {
    Value(Vec<u8>),
    End,
    Stored,
    NotStored,
}

async fn roundtrip(conn: &mut Connection, request: &[u8]) -> Result<Response> {
    conn.write_all(request).await?;
    conn.flush().await?;

    let line = read_line(conn).await?;
    match line.as_str() {
        "END" => Ok(Response::End),
        "STORED" => Ok(Response::Stored),
        "NOT_STORED" | "EXISTS" => Ok(Response::NotStored),
        other if other.starts_with("VALUE ") => {
            // VALUE <key> <flags> <bytes>
            let len: usize = other
                .split_whitespace()
                .nth(3)
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| CacheError::Unavailable(format!("bad memcached header: {}", other)))?;

            let mut data = vec![0u8; len + 2];
            conn.read_exact(&mut data).await?;
            data.truncate(len);

            let trailer = read_line(conn).await?;
            if trailer != "END" {
                return Err(CacheError::Unavailable(format!(
                    "unexpected memcached trailer: {}",
                    trailer
                )));
            }
            Ok(Response::Value(data))
        }
        other => Err(CacheError::Unavailable(format!("memcached replied: {}", other))),
    }
}

async fn read_line(conn: &mut Connection) -> Result<String> {
    let mut line = String::new();
    if conn.read_line(&mut line).await? == 0 {
        return Err(CacheError::Unavailable("memcached closed the connection".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

// == Memcache Backend ==
pub struct MemcacheBackend {
    servers: Vec<Server>,
}

impl MemcacheBackend {
    /// Opens one connection to every configured server.
    pub async fn connect(config: &MemcacheConfig) -> Result<Self> {
        if config.hosts.is_empty() {
            return Err(CacheError::Unavailable("no memcached hosts configured".to_string()));
        }

        let mut servers = Vec::with_capacity(config.hosts.len());
        for addr in &config.hosts {
            let conn = Server::open(addr).await?;
            servers.push(Server {
                addr: addr.clone(),
                conn: Mutex::new(Some(conn)),
            });
        }
        info!("Connected to memcached servers {}", config.hosts.join(","));

        Ok(Self { servers })
    }

    fn server_for(&self, key: &str) -> &Server {
        let index = (fnv1a(key.as_bytes()) % self.servers.len() as u64) as usize;
        &self.servers[index]
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf29ce484222325u64, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.len() > MAX_KEY_LENGTH
        || key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return Err(CacheError::InvalidRequest(format!(
            "key {:?} cannot be stored in memcached",
            key
        )));
    }
    Ok(())
}

/// Memcached reads large relative values as absolute Unix timestamps.
fn expiration(ttl_seconds: u64) -> u64 {
    if ttl_seconds <= MAX_RELATIVE_EXPIRATION {
        return ttl_seconds;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    now.saturating_add(ttl_seconds)
}

#[async_trait]
impl Backend for MemcacheBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let request = format!("get {}\r\n", key);

        match self.server_for(key).exchange(request.as_bytes()).await? {
            Response::Value(data) => Ok(data),
            Response::End => Err(CacheError::NotFound(key.to_string())),
            other => {
                warn!(?other, "Unexpected memcached reply to get");
                Err(CacheError::Unavailable("unexpected memcached reply".to_string()))
            }
        }
    }

    async fn put(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<String> {
        validate_key(key)?;
        let mut request = format!(
            "add {} 0 {} {}\r\n",
            key,
            expiration(ttl_seconds),
            payload.len()
        )
        .into_bytes();
        request.extend_from_slice(&payload);
        request.extend_from_slice(b"\r\n");

        match self.server_for(key).exchange(&request).await? {
            Response::Stored => Ok(key.to_string()),
            Response::NotStored => Err(CacheError::KeyExists(key.to_string())),
            other => {
                warn!(?other, "Unexpected memcached reply to add");
                Err(CacheError::Unavailable("unexpected memcached reply".to_string()))
            }
        }
    }
}
