//! Entity abstraction shared by every record kind the services persist.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Store-assigned identity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record kinds served by this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Movie,
    User,
}

impl EntityKind {
    /// Stable lowercase name, used in cache keys and event keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Movie => "movie",
            EntityKind::User => "user",
        }
    }

    /// Log topic that receives this kind's mutation events.
    pub const fn default_topic(self) -> &'static str {
        match self {
            EntityKind::Movie => "movie-events",
            EntityKind::User => "user-events",
        }
    }

    /// Port a service for this kind listens on unless configured otherwise.
    pub const fn default_port(self) -> u16 {
        match self {
            EntityKind::Movie => 8082,
            EntityKind::User => 8081,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted record with a store-assigned id and opaque domain fields.
///
/// The snapshot written to the cache and the payload of create/update events
/// are both the JSON serialization of the implementing type.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Caller-supplied fields for create and update.
    type Fields: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn from_parts(id: EntityId, fields: Self::Fields) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&EntityId::new(42)).expect("serialize id");
        assert_eq!(json, "42");

        let parsed: EntityId = serde_json::from_str("1000").expect("parse id");
        assert_eq!(parsed.get(), 1000);
    }

    #[test]
    fn kinds_have_distinct_names_and_topics() {
        assert_ne!(EntityKind::Movie.as_str(), EntityKind::User.as_str());
        assert_eq!(EntityKind::Movie.default_topic(), "movie-events");
        assert_eq!(EntityKind::User.default_topic(), "user-events");
    }
}
