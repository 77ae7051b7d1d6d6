//! Movie catalog and user services built on one shared core: a bounded-retry
//! dependency bootstrap and a cache-aside mutation protocol over Postgres,
//! Redis and Kafka.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod events;
pub mod infra;
