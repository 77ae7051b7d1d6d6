use async_trait::async_trait;
use thiserror::Error;

use super::message::EventMessage;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("log connection error: {0}")]
    Connection(String),
    #[error("failed to ensure topic `{topic}`: {message}")]
    TopicSetup { topic: String, message: String },
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Append-only log client.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Create the configured topic if it does not exist; an existing topic is success.
    async fn ensure_topic(&self) -> Result<(), PublishError>;

    async fn publish(&self, message: &EventMessage) -> Result<(), PublishError>;
}
