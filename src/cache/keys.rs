//! Cache key derivation.
//!
//! Keys are `<kind>:<decimal id>`, so the same id always addresses the same
//! entry across create, read, update and delete, and two kinds never collide.

use std::fmt;

use crate::domain::entity::{Entity, EntityId, EntityKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self(format!("{}:{}", kind.as_str(), id.get()))
    }

    /// Key for the record of type `E` with the given id.
    pub fn for_entity<E: Entity>(id: EntityId) -> Self {
        Self::new(E::KIND, id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::entities::{MovieRecord, UserRecord};

    #[test]
    fn key_is_decimal_and_prefixed_by_kind() {
        let key = CacheKey::new(EntityKind::Movie, EntityId::new(7));
        assert_eq!(key.as_str(), "movie:7");

        let key = CacheKey::for_entity::<UserRecord>(EntityId::new(1000));
        assert_eq!(key.as_str(), "user:1000");
    }

    #[test]
    fn same_id_yields_same_key() {
        let first = CacheKey::for_entity::<MovieRecord>(EntityId::new(7));
        let second = CacheKey::for_entity::<MovieRecord>(EntityId::new(7));
        assert_eq!(first, second);
    }

    #[test]
    fn keys_do_not_collide_across_ids_or_kinds() {
        let mut seen = HashSet::new();
        for id in [0, 1, 10, 100, 1000, 65_536, -1, i64::MAX] {
            assert!(seen.insert(CacheKey::new(EntityKind::Movie, EntityId::new(id))));
            assert!(seen.insert(CacheKey::new(EntityKind::User, EntityId::new(id))));
        }
    }
}
