use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, EntityKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieFields {
    pub title: String,
    pub genre: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: EntityId,
    pub title: String,
    pub genre: String,
    pub year: i32,
}

impl Entity for MovieRecord {
    type Fields = MovieFields;

    const KIND: EntityKind = EntityKind::Movie;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_parts(id: EntityId, fields: MovieFields) -> Self {
        Self {
            id,
            title: fields.title,
            genre: fields.genre,
            year: fields.year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFields {
    pub email: String,
    pub membership_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: EntityId,
    pub email: String,
    pub membership_type: String,
}

impl Entity for UserRecord {
    type Fields = UserFields;

    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_parts(id: EntityId, fields: UserFields) -> Self {
        Self {
            id,
            email: fields.email,
            membership_type: fields.membership_type,
        }
    }
}
