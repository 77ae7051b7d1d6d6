//! Mutation event log: message format, publisher contract and the outbox that
//! decouples delivery from request handling.

mod message;
mod outbox;
mod publisher;

pub use message::{EventMessage, EventOp};
pub use outbox::{
    EventOutbox, METRIC_EVENT_DROPPED, METRIC_EVENT_FAILED, METRIC_EVENT_PUBLISHED, OutboxConfig,
    OutboxWorker,
};
pub use publisher::{EventPublisher, PublishError};
