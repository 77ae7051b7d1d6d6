//! Mutation events appended to the log.

use std::fmt;

use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entity::{Entity, EntityId, EntityKind};

/// Mutation that produced an event. Reads never produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOp {
    Create,
    Update,
    Delete,
}

impl EventOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventOp::Create => "create",
            EventOp::Update => "update",
            EventOp::Delete => "delete",
        }
    }
}

impl fmt::Display for EventOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable `{key, value}` record destined for the log.
///
/// The key is `<op>_<kind>` (for example `create_movie`). Create and update
/// events carry the record snapshot; delete events carry `{"id": <id>}`.
#[derive(Debug, Clone)]
pub struct EventMessage {
    id: Uuid,
    op: EventOp,
    kind: EntityKind,
    key: String,
    value: Bytes,
    timestamp: OffsetDateTime,
}

impl EventMessage {
    pub fn new(op: EventOp, kind: EntityKind, value: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            op,
            kind,
            key: format!("{}_{}", op.as_str(), kind.as_str()),
            value: value.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Event for a created or updated record, carrying its serialized snapshot.
    pub fn snapshot<E: Entity>(op: EventOp, snapshot: Bytes) -> Self {
        Self::new(op, E::KIND, snapshot)
    }

    /// Event for a deleted record.
    pub fn deleted<E: Entity>(id: EntityId) -> Self {
        let payload = serde_json::json!({ "id": id.get() }).to_string();
        Self::new(EventOp::Delete, E::KIND, payload)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn op(&self) -> EventOp {
        self.op
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Enqueue time in milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        (self.timestamp.unix_timestamp_nanos() / 1_000_000) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{MovieRecord, UserRecord};

    #[test]
    fn key_combines_operation_and_kind() {
        let message = EventMessage::snapshot::<MovieRecord>(EventOp::Create, Bytes::new());
        assert_eq!(message.key(), "create_movie");

        let message = EventMessage::snapshot::<UserRecord>(EventOp::Update, Bytes::new());
        assert_eq!(message.key(), "update_user");
    }

    #[test]
    fn delete_payload_identifies_the_record() {
        let message = EventMessage::deleted::<MovieRecord>(EntityId::new(1000));
        assert_eq!(message.key(), "delete_movie");
        assert_eq!(message.op(), EventOp::Delete);

        let payload: serde_json::Value =
            serde_json::from_slice(message.value()).expect("json payload");
        assert_eq!(payload["id"], 1000);
    }

    #[test]
    fn each_message_gets_a_unique_id() {
        let first = EventMessage::deleted::<MovieRecord>(EntityId::new(1));
        let second = EventMessage::deleted::<MovieRecord>(EntityId::new(1));
        assert_ne!(first.id(), second.id());
        assert!(first.timestamp_millis() > 0);
    }
}
