//! Rate Limiting Middleware
//!
//! Per-client token buckets for the public router. Clients are keyed by the
//! last address in `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
//! Buckets untouched for an hour are dropped by the sweep task and a client
//! returning after that starts with a full bucket.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tracing::debug;

use crate::config::RateLimiterConfig;
use crate::metrics::Metrics;

/// How long a client bucket may sit idle before it is forgotten.
pub const IDLE_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Body returned with every rejection.
pub const RATE_LIMIT_MESSAGE: &str = r#"{ "error": "rate limit" }"#;

/// Key used when no client address can be determined.
const UNKNOWN_CLIENT: &str = "unknown";

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

struct ClientBucket {
    limiter: DirectRateLimiter,
    last_seen: Instant,
}

impl ClientBucket {
    fn new(quota: Quota, now: Instant) -> Self {
        Self {
            limiter: RateLimiter::direct(quota),
            last_seen: now,
        }
    }
}

struct LimiterInner {
    quota: Quota,
    buckets: DashMap<String, ClientBucket>,
    metrics: Option<Arc<Metrics>>,
}

// == Client Rate Limiter ==
/// Shared limiter state. Cloning shares the same buckets.
#[derive(Clone)]
pub struct ClientRateLimiter {
    inner: Arc<LimiterInner>,
}

impl ClientRateLimiter {
    /// Creates a limiter allowing `requests_per_second` per client.
    pub fn new(requests_per_second: NonZeroU32) -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                quota: Quota::per_second(requests_per_second),
                buckets: DashMap::new(),
                metrics: None,
            }),
        }
    }

    /// Builds the limiter when enabled; `None` means no middleware at all.
    pub fn from_config(config: &RateLimiterConfig, metrics: Option<Arc<Metrics>>) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let rate = NonZeroU32::new(config.num_requests)?;
        Some(Self {
            inner: Arc::new(LimiterInner {
                quota: Quota::per_second(rate),
                buckets: DashMap::new(),
                metrics,
            }),
        })
    }

    /// Takes one token for `client`; false when the bucket is empty.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit notion of "now" for idle tracking.
    pub fn check_at(&self, client: &str, now: Instant) -> bool {
        let quota = self.inner.quota;
        // The entry guard holds the shard lock, making refresh + check atomic per client
        let mut bucket = self
            .inner
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| ClientBucket::new(quota, now));

        if now.saturating_duration_since(bucket.last_seen) > IDLE_EXPIRATION {
            *bucket = ClientBucket::new(quota, now);
        }
        bucket.last_seen = now;
        bucket.limiter.check().is_ok()
    }

    /// Drops buckets idle for longer than [`IDLE_EXPIRATION`].
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    pub fn sweep_idle_at(&self, now: Instant) -> usize {
        let before = self.inner.buckets.len();
        self.inner
            .buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) <= IDLE_EXPIRATION);
        before.saturating_sub(self.inner.buckets.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.inner.buckets.len()
    }

    fn record_rejection(&self) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_rate_limited();
        }
    }
}

// == Client Identification ==
/// Derives the bucket key for a request.
///
/// Only the last `X-Forwarded-For` hop is used: it is the one appended by the
/// proxy in front of us, while earlier hops come from the client.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.rsplit(',').map(str::trim).find(|hop| !hop.is_empty()))
        .and_then(|ip| ip.parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    };

    forwarded
        .or_else(real_ip)
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

// == Middleware ==
/// Rejects requests from clients whose bucket is empty.
pub async fn rate_limit_middleware(
    State(limiter): State<ClientRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);

    if limiter.check(&client) {
        next.run(request).await
    } else {
        debug!(client = %client, "Request rejected by rate limiter");
        limiter.record_rejection();
        rate_limit_response()
    }
}

/// The fixed rejection returned to throttled clients.
pub fn rate_limit_response() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::CONTENT_TYPE, "application/json")],
        RATE_LIMIT_MESSAGE,
    )
        .into_response()
}
