//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod deps;
pub mod error;
pub mod http;
pub mod kafka;
pub mod redis;
pub mod server;
pub mod telemetry;
