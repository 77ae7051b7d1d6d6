//! Application layer: the startup connector, the cache-aside entity service
//! and the contracts it depends on.

pub mod bootstrap;
pub mod error;
pub mod repos;
pub mod service;
