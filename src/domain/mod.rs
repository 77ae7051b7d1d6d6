//! Domain records and the entity abstraction.

pub mod entities;
pub mod entity;
