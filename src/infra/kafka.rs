//! Kafka-backed event log.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use tracing::{debug, info};

use crate::events::{EventMessage, EventPublisher, PublishError};

const SOURCE: &str = "reelhouse::infra::kafka";
const TOPIC_PARTITIONS: i32 = 1;
const TOPIC_REPLICATION: i32 = 1;

pub struct KafkaPublisher {
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
    topic: String,
    delivery_timeout: Duration,
}

impl KafkaPublisher {
    /// Build the producer and admin clients. Brokers are contacted lazily.
    pub fn new(
        brokers: &str,
        topic: impl Into<String>,
        delivery_timeout: Duration,
    ) -> Result<Self, PublishError> {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", brokers)
            .set(
                "message.timeout.ms",
                delivery_timeout.as_millis().to_string(),
            );

        let producer: FutureProducer = config
            .create()
            .map_err(|err| PublishError::Connection(err.to_string()))?;
        let admin: AdminClient<DefaultClientContext> = config
            .create()
            .map_err(|err| PublishError::Connection(err.to_string()))?;

        Ok(Self {
            producer,
            admin,
            topic: topic.into(),
            delivery_timeout,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Fetch cluster metadata; fails while no broker answers.
    pub async fn probe(&self) -> Result<(), PublishError> {
        let producer = self.producer.clone();
        let timeout = self.delivery_timeout;
        let metadata = tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|err| PublishError::Connection(err.to_string()))?
        .map_err(|err| PublishError::Connection(err.to_string()))?;

        debug!(target = SOURCE, brokers = metadata, "Fetched cluster metadata");
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn ensure_topic(&self) -> Result<(), PublishError> {
        let new_topic = NewTopic::new(
            &self.topic,
            TOPIC_PARTITIONS,
            TopicReplication::Fixed(TOPIC_REPLICATION),
        );
        let options = AdminOptions::new().request_timeout(Some(self.delivery_timeout));

        let results = self
            .admin
            .create_topics(vec![&new_topic], &options)
            .await
            .map_err(|err| PublishError::TopicSetup {
                topic: self.topic.clone(),
                message: err.to_string(),
            })?;

        for result in results {
            match result {
                Ok(topic) => info!(target = SOURCE, topic = %topic, "Created topic"),
                Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    debug!(target = SOURCE, topic = %topic, "Topic already exists")
                }
                Err((topic, code)) => {
                    return Err(PublishError::TopicSetup {
                        topic,
                        message: format!("{code:?}"),
                    });
                }
            }
        }

        Ok(())
    }

    async fn publish(&self, message: &EventMessage) -> Result<(), PublishError> {
        let record = FutureRecord::to(&self.topic)
            .key(message.key())
            .payload(&message.value()[..])
            .timestamp(message.timestamp_millis());

        self.producer
            .send(record, self.delivery_timeout)
            .await
            .map(|_| ())
            .map_err(|(err, _)| PublishError::Delivery(err.to_string()))
    }
}
