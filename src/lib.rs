//! Shortstash - a short-lived key/value cache front-end
//!
//! Stores tagged JSON, XML and text payloads under generated keys in a
//! pluggable backend, governed by TTL, size, compression and metrics layers.

pub mod api;
pub mod backend;
pub mod config;
pub mod decorators;
pub mod error;
pub mod metrics;
pub mod models;
pub mod payload;
pub mod tasks;
pub mod ttl;
pub mod version;

pub use api::AppState;
pub use config::Config;
