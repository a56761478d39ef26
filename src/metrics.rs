//! Backend Metrics Module
//!
//! Tracks what flows through the decorator chain: payload types and sizes on
//! write, hits and misses on read, and latency for both. Counters are atomics
//! so the one `Metrics` instance can be shared by every concurrent request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::payload::PayloadType;

// == Metrics ==
/// Append-only counters shared across all workers.
#[derive(Debug)]
pub struct Metrics {
    started_at: DateTime<Utc>,
    puts_json: AtomicU64,
    puts_xml: AtomicU64,
    puts_text: AtomicU64,
    puts_invalid: AtomicU64,
    put_bytes: AtomicU64,
    put_successes: AtomicU64,
    put_bad_requests: AtomicU64,
    put_errors: AtomicU64,
    put_duration_us: AtomicU64,
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    get_errors: AtomicU64,
    get_duration_us: AtomicU64,
    rate_limited: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    // == Constructor ==
    /// Creates a new Metrics with all counters at zero.
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            puts_json: AtomicU64::new(0),
            puts_xml: AtomicU64::new(0),
            puts_text: AtomicU64::new(0),
            puts_invalid: AtomicU64::new(0),
            put_bytes: AtomicU64::new(0),
            put_successes: AtomicU64::new(0),
            put_bad_requests: AtomicU64::new(0),
            put_errors: AtomicU64::new(0),
            put_duration_us: AtomicU64::new(0),
            get_hits: AtomicU64::new(0),
            get_misses: AtomicU64::new(0),
            get_errors: AtomicU64::new(0),
            get_duration_us: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        }
    }

    // == Writes ==
    /// Records the declared type and logical size of a payload being written.
    pub fn record_put_payload(&self, kind: Option<PayloadType>, size: usize) {
        let counter = match kind {
            Some(PayloadType::Json) => &self.puts_json,
            Some(PayloadType::Xml) => &self.puts_xml,
            Some(PayloadType::Text) => &self.puts_text,
            None => &self.puts_invalid,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.put_bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_put_success(&self, elapsed: Duration) {
        self.put_successes.fetch_add(1, Ordering::Relaxed);
        self.put_duration_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// A write the chain refused (too large, bad TTL, malformed).
    pub fn record_put_bad_request(&self) {
        self.put_bad_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_put_error(&self) {
        self.put_errors.fetch_add(1, Ordering::Relaxed);
    }

    // == Reads ==
    pub fn record_get_hit(&self, elapsed: Duration) {
        self.get_hits.fetch_add(1, Ordering::Relaxed);
        self.get_duration_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_get_miss(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get_error(&self) {
        self.get_errors.fetch_add(1, Ordering::Relaxed);
    }

    // == Rate Limiting ==
    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let put_successes = load(&self.put_successes);
        let get_hits = load(&self.get_hits);
        let get_misses = load(&self.get_misses);

        MetricsSnapshot {
            started_at: self.started_at.to_rfc3339(),
            puts: PutSnapshot {
                json: load(&self.puts_json),
                xml: load(&self.puts_xml),
                text: load(&self.puts_text),
                invalid: load(&self.puts_invalid),
                bytes: load(&self.put_bytes),
                successes: put_successes,
                bad_requests: load(&self.put_bad_requests),
                errors: load(&self.put_errors),
                avg_duration_us: average(load(&self.put_duration_us), put_successes),
            },
            gets: GetSnapshot {
                hits: get_hits,
                misses: get_misses,
                errors: load(&self.get_errors),
                hit_rate: hit_rate(get_hits, get_misses),
                avg_duration_us: average(load(&self.get_duration_us), get_hits),
            },
            rate_limited: load(&self.rate_limited),
        }
    }
}

fn average(total: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        total / count
    }
}

/// Returns hits / (hits + misses), or 0.0 if no reads have been made.
fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Snapshot Types ==
/// Point-in-time copy of all counters, served by the admin `/stats` route.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub started_at: String,
    pub puts: PutSnapshot,
    pub gets: GetSnapshot,
    pub rate_limited: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PutSnapshot {
    pub json: u64,
    pub xml: u64,
    pub text: u64,
    pub invalid: u64,
    pub bytes: u64,
    pub successes: u64,
    pub bad_requests: u64,
    pub errors: u64,
    pub avg_duration_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub hit_rate: f64,
    pub avg_duration_us: u64,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_metrics_new() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.puts.successes, 0);
        assert_eq!(snapshot.gets.hits, 0);
        assert_eq!(snapshot.gets.hit_rate, 0.0);
    }

    #[test]
    fn test_put_payload_by_type() {
        let metrics = Metrics::new();
        metrics.record_put_payload(Some(PayloadType::Json), 10);
        metrics.record_put_payload(Some(PayloadType::Xml), 20);
        metrics.record_put_payload(None, 5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.puts.json, 1);
        assert_eq!(snapshot.puts.xml, 1);
        assert_eq!(snapshot.puts.text, 0);
        assert_eq!(snapshot.puts.invalid, 1);
        assert_eq!(snapshot.puts.bytes, 35);
    }

    #[test]
    fn test_hit_rate() {
        let metrics = Metrics::new();
        for _ in 0..8 {
            metrics.record_get_hit(Duration::from_micros(10));
        }
        metrics.record_get_miss();
        metrics.record_get_miss();

        let snapshot = metrics.snapshot();
        assert!((snapshot.gets.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(snapshot.gets.avg_duration_us, 10);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(Metrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_put_payload(Some(PayloadType::Text), 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().puts.text, 4000);
    }
}
