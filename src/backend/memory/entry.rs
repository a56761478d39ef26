//! Memory Record Module
//!
//! A stored payload together with its absolute expiry time.

use std::time::{SystemTime, UNIX_EPOCH};

// == Memory Record ==
/// A single payload held by the in-memory engine.
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    /// The stored bytes, exactly as handed to `put`
    pub payload: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl MemoryRecord {
    // == Constructor ==
    /// Creates a record that expires `ttl_seconds` from now.
    ///
    /// A TTL of 0 means the record never expires on its own.
    pub fn new(payload: Vec<u8>, ttl_seconds: u64) -> Self {
        let expires_at = match ttl_seconds {
            0 => None,
            ttl => Some(current_timestamp_ms().saturating_add(ttl.saturating_mul(1000))),
        };

        Self {
            payload,
            expires_at,
        }
    }

    // == Is Expired ==
    /// A record is expired once the current time reaches its expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms >= expires)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
