//! Snapshot cache used by the cache-aside entity services.
//!
//! The cache is an accelerator only: every entry is a JSON snapshot of one
//! record, addressed by [`CacheKey`] and written with the [`CachePolicy`] TTL.
//! Production deployments back it with Redis (`infra::redis`); [`MemoryCache`]
//! serves tests and single-process runs.
//!
//! ```toml
//! [cache]
//! url = "redis://127.0.0.1:6379"
//! ttl_seconds = 86400
//! operation_timeout_ms = 500
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CachePolicy;
pub use keys::CacheKey;
pub use store::{CacheError, CacheStore, MemoryCache};
