//! Build version information served by `GET /version`.

/// Crate version from Cargo metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source revision, injected at build time through `STASH_GIT_REVISION`.
pub fn revision() -> &'static str {
    option_env!("STASH_GIT_REVISION").unwrap_or("unknown")
}
