//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

/// Response body for the write route (POST /cache)
#[derive(Debug, Clone, Serialize)]
pub struct PutResponse {
    /// One entry per requested put, in request order
    pub responses: Vec<PutResponseObject>,
}

/// Key a value was stored under. Empty when a client key was already taken.
#[derive(Debug, Clone, Serialize)]
pub struct PutResponseObject {
    pub uuid: String,
}

impl PutResponseObject {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }
}

/// Response body for the version route (GET /version)
#[derive(Debug, Clone, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub revision: String,
}

impl VersionResponse {
    pub fn new(version: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            revision: revision.into(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_response_serialize() {
        let resp = PutResponse {
            responses: vec![PutResponseObject::new("abc"), PutResponseObject::new("")],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"responses":[{"uuid":"abc"},{"uuid":""}]}"#);
    }

    #[test]
    fn test_version_response_serialize() {
        let json = serde_json::to_string(&VersionResponse::new("1.2.3", "abcdef")).unwrap();
        assert!(json.contains(r#""version":"1.2.3""#));
        assert!(json.contains(r#""revision":"abcdef""#));
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("rate limit")).unwrap();
        assert_eq!(json, r#"{"error":"rate limit"}"#);
    }
}
