//! TTL Ceiling Resolution
//!
//! Each storage engine historically shipped its own expiry default before the
//! unified `request_limits.max_ttl_seconds` existed. The resolver reconciles
//! those sources into the single ceiling every write is checked against: the
//! smallest non-zero candidate wins, so the unified limit can only tighten the
//! legacy behavior, never loosen it.

use crate::config::{BackendConfig, BackendType, Config, CASSANDRA_DEFAULT_TTL_SECONDS};

/// Ceiling value meaning "no limit".
pub const UNLIMITED: u64 = 0;

/// Resolves the effective TTL ceiling for a configuration.
///
/// Returns [`UNLIMITED`] when every candidate is unset.
pub fn resolve_ttl_ceiling(config: &Config) -> u64 {
    resolve(config.request_limits.max_ttl_seconds, &config.backend)
}

/// Resolves the ceiling from the global limit and the backend section.
pub fn resolve(global_max_ttl_seconds: u64, backend: &BackendConfig) -> u64 {
    smallest_non_zero([global_max_ttl_seconds, backend_candidate(backend)])
}

/// The backend's own legacy ceiling, or 0 when it has none.
fn backend_candidate(backend: &BackendConfig) -> u64 {
    match backend.kind {
        BackendType::Cassandra => CASSANDRA_DEFAULT_TTL_SECONDS,
        BackendType::Aerospike => backend.aerospike.default_ttl_seconds,
        BackendType::Redis => backend.redis.expiration_minutes.saturating_mul(60),
        BackendType::Memory | BackendType::Memcache => UNLIMITED,
    }
}

fn smallest_non_zero<const N: usize>(candidates: [u64; N]) -> u64 {
    candidates
        .into_iter()
        .filter(|&c| c != UNLIMITED)
        .min()
        .unwrap_or(UNLIMITED)
}
