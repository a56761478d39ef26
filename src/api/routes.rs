//! API Routes
//!
//! Builds the two routers served by the process. The admin router exposes
//! every route with no CORS and no rate limiting. The public router always
//! exposes the read routes, exposes writes only when configured to, and is
//! wrapped in CORS and then in per-client rate limiting.

use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    get_handler, index_handler, put_handler, stats_handler, status_handler, version_handler,
    AppState,
};
use super::rate_limit::{rate_limit_middleware, ClientRateLimiter};

fn cache_route(allow_write: bool) -> MethodRouter<AppState> {
    if allow_write {
        get(get_handler).post(put_handler)
    } else {
        get(get_handler)
    }
}

fn base_routes(allow_write: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/status", get(status_handler))
        .route("/version", get(version_handler))
        .route("/cache", cache_route(allow_write))
}

/// CORS for browsers calling the public port: any origin is mirrored back
/// and credentials are allowed.
///
/// Methods and headers are listed explicitly since tower-http refuses
/// wildcards together with credentials.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::HEAD])
        .allow_headers([
            header::ORIGIN,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
        ])
}

/// Creates the admin router.
///
/// # Endpoints
/// - `GET /`, `GET /status`, `GET /version`
/// - `GET /cache?uuid=` and `POST /cache`
/// - `GET /stats` - metrics snapshot
pub fn admin_router(state: AppState) -> Router {
    base_routes(true)
        .route("/stats", get(stats_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the public router.
///
/// `limiter` is `None` when rate limiting is disabled, in which case no
/// limiting layer is installed.
pub fn public_router(state: AppState, limiter: Option<ClientRateLimiter>) -> Router {
    let allow_write = state.config.routes.allow_public_write;
    let router = base_routes(allow_write)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state);

    match limiter {
        Some(limiter) => {
            router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        }
        None => router,
    }
}
