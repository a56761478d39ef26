//! Configuration Module
//!
//! Handles loading and validating server configuration from environment
//! variables. Every variable carries the `STASH_` prefix, e.g.
//! `STASH_BACKEND_TYPE` or `STASH_REQUEST_LIMITS_MAX_TTL_SECONDS`.
//!
//! Loading doubles as the startup validation phase: any malformed or
//! out-of-range value is reported as a [`ConfigError`] and the process never
//! starts serving traffic.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::error::ConfigError;

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "STASH_";

/// Legacy TTL ceiling the Cassandra engine has always enforced.
pub const CASSANDRA_DEFAULT_TTL_SECONDS: u64 = 2400;

/// Default for `request_limits.max_size_bytes`.
pub const REQUEST_MAX_SIZE_BYTES: i64 = 10 * 1024;

/// Default for `request_limits.max_num_values`.
pub const REQUEST_MAX_NUM_VALUES: i64 = 10;

/// Default for `request_limits.max_ttl_seconds`.
pub const REQUEST_MAX_TTL_SECONDS: i64 = 3600;

/// Default for `rate_limiter.num_requests`.
pub const RATE_LIMITER_NUM_REQUESTS: u32 = 100;

// == Backend Type ==
/// Storage engine selected by `backend.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Memory,
    Redis,
    Cassandra,
    Memcache,
    Aerospike,
}

impl FromStr for BackendType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(BackendType::Memory),
            "redis" => Ok(BackendType::Redis),
            "cassandra" => Ok(BackendType::Cassandra),
            "memcache" => Ok(BackendType::Memcache),
            "aerospike" => Ok(BackendType::Aerospike),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendType::Memory => "memory",
            BackendType::Redis => "redis",
            BackendType::Cassandra => "cassandra",
            BackendType::Memcache => "memcache",
            BackendType::Aerospike => "aerospike",
        };
        f.write_str(name)
    }
}

// == Compression Type ==
/// Compression applied to payloads before they reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Snappy,
}

impl FromStr for CompressionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CompressionType::None),
            "snappy" => Ok(CompressionType::Snappy),
            other => Err(ConfigError::UnknownCompression(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionType::None => f.write_str("none"),
            CompressionType::Snappy => f.write_str("snappy"),
        }
    }
}

// == Backend Settings ==
/// In-memory engine settings.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of records before LRU eviction kicks in
    pub max_entries: usize,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            cleanup_interval: 1,
        }
    }
}

/// Redis engine settings.
#[derive(Debug, Clone, Default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
    /// Legacy default expiration, in minutes. 0 means none.
    pub expiration_minutes: u64,
    pub tls_enabled: bool,
    pub tls_insecure_skip_verify: bool,
}

/// Cassandra engine settings.
#[derive(Debug, Clone)]
pub struct CassandraConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub default_ttl_seconds: u64,
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            keyspace: String::new(),
            default_ttl_seconds: CASSANDRA_DEFAULT_TTL_SECONDS,
        }
    }
}

/// Memcached engine settings.
#[derive(Debug, Clone, Default)]
pub struct MemcacheConfig {
    pub hosts: Vec<String>,
}

/// Aerospike settings. The engine itself cannot be built, but its default
/// TTL still takes part in TTL ceiling resolution.
#[derive(Debug, Clone, Default)]
pub struct AerospikeConfig {
    pub default_ttl_seconds: u64,
}

/// `backend.*` section.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendType,
    pub memory: MemoryConfig,
    pub redis: RedisConfig,
    pub cassandra: CassandraConfig,
    pub memcache: MemcacheConfig,
    pub aerospike: AerospikeConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendType::Memory,
            memory: MemoryConfig::default(),
            redis: RedisConfig::default(),
            cassandra: CassandraConfig::default(),
            memcache: MemcacheConfig::default(),
            aerospike: AerospikeConfig::default(),
        }
    }
}

// == Request Limits ==
/// `request_limits.*` section. A value of 0 disables the matching limit.
#[derive(Debug, Clone)]
pub struct RequestLimits {
    pub max_size_bytes: usize,
    pub max_num_values: usize,
    pub max_ttl_seconds: u64,
    pub allow_setting_keys: bool,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: REQUEST_MAX_SIZE_BYTES as usize,
            max_num_values: REQUEST_MAX_NUM_VALUES as usize,
            max_ttl_seconds: REQUEST_MAX_TTL_SECONDS as u64,
            allow_setting_keys: false,
        }
    }
}

/// `rate_limiter.*` section.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub enabled: bool,
    /// Requests per second allowed for a single client
    pub num_requests: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_requests: RATE_LIMITER_NUM_REQUESTS,
        }
    }
}

/// `routes.*` section.
#[derive(Debug, Clone)]
pub struct RoutesConfig {
    pub allow_public_write: bool,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            allow_public_write: true,
        }
    }
}

// == Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public HTTP server port
    pub port: u16,
    /// Administrative HTTP server port
    pub admin_port: u16,
    /// Body returned by `GET /`
    pub index_response: String,
    /// Body returned by `GET /status`; empty means 204
    pub status_response: String,
    pub backend: BackendConfig,
    pub compression: CompressionType,
    pub request_limits: RequestLimits,
    pub rate_limiter: RateLimiterConfig,
    pub routes: RoutesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 2424,
            admin_port: 2525,
            index_response: "This application stores short-term data.".to_string(),
            status_response: String::new(),
            backend: BackendConfig::default(),
            compression: CompressionType::Snappy,
            request_limits: RequestLimits::default(),
            rate_limiter: RateLimiterConfig::default(),
            routes: RoutesConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for unknown backend or compression types,
    /// negative limits, unparsable numbers, or missing backend settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// `lookup` receives fully prefixed names such as `STASH_PORT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = Config::default();

        let backend = BackendConfig {
            kind: vars.string("BACKEND_TYPE", "memory").parse()?,
            memory: MemoryConfig {
                max_entries: vars.limit("BACKEND_MEMORY_MAX_ENTRIES", 100_000)? as usize,
                cleanup_interval: vars.limit("BACKEND_MEMORY_CLEANUP_INTERVAL", 1)?,
            },
            redis: RedisConfig {
                host: vars.string("BACKEND_REDIS_HOST", ""),
                port: vars.parse("BACKEND_REDIS_PORT", 6379)?,
                password: vars.string("BACKEND_REDIS_PASSWORD", ""),
                db: vars.parse("BACKEND_REDIS_DB", 0)?,
                expiration_minutes: vars.limit("BACKEND_REDIS_EXPIRATION", 0)?,
                tls_enabled: vars.parse("BACKEND_REDIS_TLS_ENABLED", false)?,
                tls_insecure_skip_verify: vars
                    .parse("BACKEND_REDIS_TLS_INSECURE_SKIP_VERIFY", false)?,
            },
            cassandra: CassandraConfig {
                hosts: vars.list("BACKEND_CASSANDRA_HOSTS"),
                keyspace: vars.string("BACKEND_CASSANDRA_KEYSPACE", ""),
                default_ttl_seconds: vars.limit(
                    "BACKEND_CASSANDRA_DEFAULT_TTL_SECONDS",
                    CASSANDRA_DEFAULT_TTL_SECONDS as i64,
                )?,
            },
            memcache: MemcacheConfig {
                hosts: vars.list("BACKEND_MEMCACHE_HOSTS"),
            },
            aerospike: AerospikeConfig {
                default_ttl_seconds: vars.limit("BACKEND_AEROSPIKE_DEFAULT_TTL_SECONDS", 0)?,
            },
        };

        let config = Self {
            port: vars.parse("PORT", defaults.port)?,
            admin_port: vars.parse("ADMIN_PORT", defaults.admin_port)?,
            index_response: vars.string("INDEX_RESPONSE", &defaults.index_response),
            status_response: vars.string("STATUS_RESPONSE", ""),
            backend,
            compression: vars.string("COMPRESSION_TYPE", "snappy").parse()?,
            request_limits: RequestLimits {
                max_size_bytes: vars
                    .limit("REQUEST_LIMITS_MAX_SIZE_BYTES", REQUEST_MAX_SIZE_BYTES)?
                    as usize,
                max_num_values: vars
                    .limit("REQUEST_LIMITS_MAX_NUM_VALUES", REQUEST_MAX_NUM_VALUES)?
                    as usize,
                max_ttl_seconds: vars
                    .limit("REQUEST_LIMITS_MAX_TTL_SECONDS", REQUEST_MAX_TTL_SECONDS)?,
                allow_setting_keys: vars.parse("REQUEST_LIMITS_ALLOW_SETTING_KEYS", false)?,
            },
            rate_limiter: RateLimiterConfig {
                enabled: vars.parse("RATE_LIMITER_ENABLED", true)?,
                num_requests: vars.parse("RATE_LIMITER_NUM_REQUESTS", RATE_LIMITER_NUM_REQUESTS)?,
            },
            routes: RoutesConfig {
                allow_public_write: vars.parse("ROUTES_ALLOW_PUBLIC_WRITE", true)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that single-variable parsing cannot catch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limiter.enabled && self.rate_limiter.num_requests == 0 {
            return Err(ConfigError::Malformed {
                name: "rate_limiter.num_requests".to_string(),
                value: "0".to_string(),
            });
        }

        match self.backend.kind {
            BackendType::Redis if self.backend.redis.host.is_empty() => {
                Err(ConfigError::Missing("backend.redis.host".to_string()))
            }
            BackendType::Cassandra if self.backend.cassandra.hosts.is_empty() => {
                Err(ConfigError::Missing("backend.cassandra.hosts".to_string()))
            }
            BackendType::Cassandra if self.backend.cassandra.keyspace.is_empty() => {
                Err(ConfigError::Missing("backend.cassandra.keyspace".to_string()))
            }
            BackendType::Memcache if self.backend.memcache.hosts.is_empty() => {
                Err(ConfigError::Missing("backend.memcache.hosts".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Logs the values the server is about to run with.
    pub fn log_summary(&self) {
        info!("config.port: {}", self.port);
        info!("config.admin_port: {}", self.admin_port);
        info!("config.backend.type: {}", self.backend.kind);
        info!("config.compression.type: {}", self.compression);
        info!(
            "config.request_limits.allow_setting_keys: {}",
            self.request_limits.allow_setting_keys
        );
        info!(
            "config.request_limits.max_size_bytes: {}",
            self.request_limits.max_size_bytes
        );
        info!(
            "config.request_limits.max_num_values: {}",
            self.request_limits.max_num_values
        );
        info!(
            "config.request_limits.max_ttl_seconds: {}",
            self.request_limits.max_ttl_seconds
        );
        info!("config.rate_limiter.enabled: {}", self.rate_limiter.enabled);
        info!(
            "config.rate_limiter.num_requests: {}",
            self.rate_limiter.num_requests
        );
        if !self.routes.allow_public_write {
            info!("Main server will only accept GET requests");
        }
    }
}

// == Variable Lookup ==
/// Typed accessors over a prefixed variable lookup.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(&format!("{}{}", ENV_PREFIX, name))
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_string())
    }

    fn list(&self, name: &str) -> Vec<String> {
        self.raw(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse<T: FromStr>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        match self.raw(name) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Malformed {
                name: config_key(name),
                value,
            }),
            None => Ok(default),
        }
    }

    /// Parses a signed value and rejects negatives.
    fn limit(&self, name: &str, default: i64) -> Result<u64, ConfigError> {
        let value: i64 = self.parse(name, default)?;
        u64::try_from(value).map_err(|_| ConfigError::NegativeLimit {
            name: config_key(name),
            value,
        })
    }
}

/// Turns `REQUEST_LIMITS_MAX_TTL_SECONDS` into `request_limits_max_ttl_seconds`.
fn config_key(name: &str) -> String {
    name.to_ascii_lowercase()
}
