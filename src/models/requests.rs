//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{CacheError, Result};
use crate::payload::PayloadType;

/// Request body for the write route (POST /cache)
#[derive(Debug, Deserialize)]
pub struct PutRequest {
    pub puts: Vec<PutObject>,
}

/// One value to store.
///
/// `value` is kept as raw JSON so `json` payloads are stored byte for byte.
#[derive(Debug, Deserialize)]
pub struct PutObject {
    /// `json`, `xml` or `text`
    #[serde(rename = "type")]
    pub kind: String,
    /// Requested TTL in seconds; 0 or absent applies the ceiling
    #[serde(rename = "ttlseconds", default)]
    pub ttl_seconds: u64,
    pub value: Box<RawValue>,
    /// Client-chosen key, honored only when setting keys is allowed
    #[serde(default)]
    pub key: Option<String>,
}

impl PutObject {
    /// Builds the tagged payload that goes to the backend.
    ///
    /// `xml` and `text` values must be JSON strings; their unescaped contents
    /// are stored.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let kind: PayloadType = self.kind.parse()?;
        match kind {
            PayloadType::Json => Ok(kind.encode(self.value.get().as_bytes())),
            PayloadType::Xml | PayloadType::Text => {
                let body: String = serde_json::from_str(self.value.get()).map_err(|_| {
                    CacheError::InvalidRequest(format!(
                        "{} values must be strings, got {}",
                        kind,
                        self.value.get()
                    ))
                })?;
                Ok(kind.encode(body.as_bytes()))
            }
        }
    }

    /// The client key, if one was given and is non-empty.
    pub fn requested_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Query string of the read route (GET /cache?uuid=...)
#[derive(Debug, Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub uuid: Option<String>,
}
