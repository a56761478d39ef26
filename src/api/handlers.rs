//! API Handlers
//!
//! HTTP request handlers for each route. Handlers only shape requests and
//! responses; every storage rule lives in the decorated backend.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::backend::BackendHandle;
use crate::config::Config;
use crate::decorators::WriteLimits;
use crate::error::{CacheError, Result};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::models::{GetQuery, PutRequest, PutResponse, PutResponseObject, VersionResponse};
use crate::payload::{self, PayloadType};
use crate::version;

/// Length of a hyphenated UUID, the only key shape generated here.
pub const UUID_LENGTH: usize = 36;

/// Application state shared across all handlers.
///
/// Both routers hold clones of the same state, so they share one governed
/// backend and one set of counters.
#[derive(Clone)]
pub struct AppState {
    /// Fully decorated backend
    pub backend: BackendHandle,
    pub metrics: Arc<Metrics>,
    pub config: Arc<Config>,
    /// Ceilings enforced by the backend's decorators
    pub write_limits: WriteLimits,
}

impl AppState {
    pub fn new(config: Arc<Config>, backend: BackendHandle, metrics: Arc<Metrics>) -> Self {
        Self {
            backend,
            metrics,
            write_limits: WriteLimits::from_config(&config),
            config,
        }
    }
}

/// Handler for GET /
pub async fn index_handler(State(state): State<AppState>) -> String {
    state.config.index_response.clone()
}

/// Handler for GET /status
///
/// 204 while no status text is configured, otherwise 200 with the text.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    if state.config.status_response.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        state.config.status_response.clone().into_response()
    }
}

/// Handler for GET /version
pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse::new(version::VERSION, version::revision()))
}

/// Handler for GET /cache?uuid=<key>
///
/// Serves the stored body with the type tag stripped and the matching
/// content type.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<GetQuery>,
) -> Result<Response> {
    let key = query
        .uuid
        .filter(|k| !k.is_empty())
        .ok_or_else(|| CacheError::InvalidRequest("Missing required parameter uuid".to_string()))?;

    if !state.config.request_limits.allow_setting_keys && key.len() != UUID_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Invalid uuid length, expected {} characters",
            UUID_LENGTH
        )));
    }

    let stored = state.backend.get(&key).await?;
    let (kind, body) = payload::decode(&stored)
        .ok_or_else(|| CacheError::Corrupted(format!("unknown payload type under {}", key)))?;

    Ok((
        [(header::CONTENT_TYPE, kind.content_type())],
        body.to_vec(),
    )
        .into_response())
}

/// Handler for POST /cache
///
/// Validates every entry, including the TTL and size ceilings, before storing
/// any of them, then stores them in request order. A client key that is
/// already taken yields an empty uuid for that entry instead of failing the
/// request.
pub async fn put_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<PutResponse>> {
    let request: PutRequest = serde_json::from_slice(&body)
        .map_err(|e| CacheError::InvalidRequest(format!("Request body could not be parsed: {}", e)))?;

    let limits = &state.config.request_limits;
    if request.puts.is_empty() {
        return Err(CacheError::InvalidRequest("No puts in request".to_string()));
    }
    if limits.max_num_values > 0 && request.puts.len() > limits.max_num_values {
        return Err(CacheError::InvalidRequest(format!(
            "More keys than allowed: {}",
            limits.max_num_values
        )));
    }

    let mut entries = Vec::with_capacity(request.puts.len());
    for put in &request.puts {
        let key = match put.requested_key() {
            Some(key) if limits.allow_setting_keys => key.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        entries.push((key, put.to_payload()?, put.ttl_seconds));
    }

    // A rejected entry must not leave earlier entries stored under keys the
    // client never receives
    for (_, payload, ttl_seconds) in &entries {
        state.write_limits.effective_ttl(*ttl_seconds)?;
        if let Err(err) = state.write_limits.check_size(payload.len()) {
            state
                .metrics
                .record_put_payload(PayloadType::detect(payload), payload.len());
            state.metrics.record_put_bad_request();
            return Err(err);
        }
    }

    let mut responses = Vec::with_capacity(entries.len());
    for (key, payload, ttl_seconds) in entries {
        match state.backend.put(&key, payload, ttl_seconds).await {
            Ok(stored) => responses.push(PutResponseObject::new(stored)),
            Err(CacheError::KeyExists(key)) => {
                debug!(key = %key, "Key already holds a value");
                responses.push(PutResponseObject::new(""));
            }
            Err(err) => return Err(err),
        }
    }

    Ok(Json(PutResponse { responses }))
}

/// Handler for GET /stats (admin only)
pub async fn stats_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::decorators::decorate;

    fn test_state(config: Config) -> AppState {
        let metrics = Arc::new(Metrics::new());
        let backend = decorate(&config, metrics.clone(), Arc::new(MemoryBackend::new(100)));
        AppState::new(Arc::new(config), backend, metrics)
    }

    fn body(json: &str) -> Bytes {
        Bytes::from(json.to_string())
    }

    fn query(uuid: &str) -> Query<GetQuery> {
        Query(GetQuery {
            uuid: Some(uuid.to_string()),
        })
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let state = test_state(Config::default());

        let Json(resp) = put_handler(
            State(state.clone()),
            body(r#"{"puts":[{"type":"xml","value":"<a/>","ttlseconds":30}]}"#),
        )
        .await
        .unwrap();
        let uuid = resp.responses[0].uuid.clone();
        assert_eq!(uuid.len(), UUID_LENGTH);

        let response = get_handler(State(state), query(&uuid)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml"
        );
    }

    #[tokio::test]
    async fn test_get_missing_uuid() {
        let state = test_state(Config::default());
        let result = get_handler(State(state), Query(GetQuery { uuid: None })).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_get_rejects_short_key_when_keys_disallowed() {
        let state = test_state(Config::default());
        let result = get_handler(State(state), query("short")).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_uuid_is_not_found() {
        let state = test_state(Config::default());
        let result = get_handler(State(state), query(&Uuid::new_v4().to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_rejects_empty_and_too_many() {
        let state = test_state(Config::default());

        let empty = put_handler(State(state.clone()), body(r#"{"puts":[]}"#)).await;
        assert!(matches!(empty, Err(CacheError::InvalidRequest(_))));

        let puts: Vec<String> = (0..11)
            .map(|i| format!(r#"{{"type":"text","value":"v{}"}}"#, i))
            .collect();
        let many = put_handler(
            State(state),
            body(&format!(r#"{{"puts":[{}]}}"#, puts.join(","))),
        )
        .await;
        assert!(matches!(many, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_put_bad_type_stores_nothing() {
        let state = test_state(Config::default());
        let result = put_handler(
            State(state.clone()),
            body(r#"{"puts":[{"type":"text","value":"ok"},{"type":"yaml","value":"x"}]}"#),
        )
        .await;

        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        assert_eq!(state.metrics.snapshot().puts.successes, 0);
    }

    #[tokio::test]
    async fn test_client_key_collision_yields_empty_uuid() {
        let mut config = Config::default();
        config.request_limits.allow_setting_keys = true;
        let state = test_state(config);
        let request = r#"{"puts":[{"type":"text","value":"first","key":"mine"}]}"#;

        let Json(first) = put_handler(State(state.clone()), body(request)).await.unwrap();
        assert_eq!(first.responses[0].uuid, "mine");

        let Json(second) = put_handler(State(state.clone()), body(request)).await.unwrap();
        assert_eq!(second.responses[0].uuid, "");

        let response = get_handler(State(state), query("mine")).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"first");
    }

    #[tokio::test]
    async fn test_client_key_ignored_when_disallowed() {
        let state = test_state(Config::default());
        let Json(resp) = put_handler(
            State(state),
            body(r#"{"puts":[{"type":"text","value":"v","key":"mine"}]}"#),
        )
        .await
        .unwrap();
        assert_ne!(resp.responses[0].uuid, "mine");
        assert_eq!(resp.responses[0].uuid.len(), UUID_LENGTH);
    }

    #[tokio::test]
    async fn test_status_handler() {
        let response = status_handler(State(test_state(Config::default()))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let mut config = Config::default();
        config.status_response = "ok".to_string();
        let response = status_handler(State(test_state(config))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_version_handler() {
        let Json(resp) = version_handler().await;
        assert_eq!(resp.version, env!("CARGO_PKG_VERSION"));
        assert!(!resp.revision.is_empty());
    }

    #[tokio::test]
    async fn test_ttl_rejection_stores_nothing_from_batch() {
        let state = test_state(Config::default());
        let result = put_handler(
            State(state.clone()),
            body(
                r#"{"puts":[{"type":"text","value":"a","ttlseconds":60},{"type":"text","value":"b","ttlseconds":99999}]}"#,
            ),
        )
        .await;

        assert!(matches!(result, Err(CacheError::TtlExceeded { .. })));
        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.puts.successes, 0);
        assert_eq!(snapshot.puts.text, 0);
    }

    #[tokio::test]
    async fn test_size_rejection_stores_nothing_from_batch() {
        let mut config = Config::default();
        config.request_limits.max_size_bytes = 16;
        let state = test_state(config);
        let result = put_handler(
            State(state.clone()),
            body(r#"{"puts":[{"type":"text","value":"ok"},{"type":"text","value":"far too long for the limit"}]}"#),
        )
        .await;

        assert!(matches!(result, Err(CacheError::PayloadTooLarge { .. })));
        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.puts.successes, 0);
        assert_eq!(snapshot.puts.text, 1);
        assert_eq!(snapshot.puts.bad_requests, 1);
    }
}
