//! API Module
//!
//! HTTP handlers, routers and middleware for the cache server.
//!
//! # Endpoints
//! - `GET /` - Configured index text
//! - `GET /status` - Health probe
//! - `GET /version` - Build version and revision
//! - `GET /cache?uuid=` - Fetch a stored value
//! - `POST /cache` - Store a batch of values
//! - `GET /stats` - Metrics snapshot (admin only)

pub mod handlers;
pub mod rate_limit;
pub mod routes;

pub use handlers::AppState;
pub use rate_limit::{rate_limit_middleware, ClientRateLimiter};
pub use routes::{admin_router, public_router};
