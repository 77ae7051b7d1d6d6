//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entity::{Entity, EntityId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Authoritative record keeper for one entity kind.
///
/// `delete` reports `RepoError::NotFound` when no record was removed so callers
/// can tell an absent id apart from a successful removal.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    async fn create(&self, fields: &E::Fields) -> Result<E, RepoError>;

    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>, RepoError>;

    async fn update(&self, id: EntityId, fields: &E::Fields) -> Result<E, RepoError>;

    async fn delete(&self, id: EntityId) -> Result<(), RepoError>;

    async fn list(&self) -> Result<Vec<E>, RepoError>;
}
