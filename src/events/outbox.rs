//! Bounded asynchronous delivery of mutation events.
//!
//! Request handlers call [`EventOutbox::enqueue`], which never waits: a full or
//! closed queue drops the message with a warning. A single [`OutboxWorker`]
//! drains the queue and delivers with bounded concurrency. Delivery failures
//! are logged and counted; they never reach the request that caused them.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::message::EventMessage;
use super::publisher::EventPublisher;

const SOURCE: &str = "reelhouse::events::outbox";

pub const METRIC_EVENT_PUBLISHED: &str = "reelhouse_event_published_total";
pub const METRIC_EVENT_FAILED: &str = "reelhouse_event_failed_total";
pub const METRIC_EVENT_DROPPED: &str = "reelhouse_event_dropped_total";

#[derive(Debug, Clone, Copy)]
pub struct OutboxConfig {
    pub capacity: NonZeroUsize,
    pub concurrency: NonZeroUsize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN),
            concurrency: NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl From<&crate::config::EventSettings> for OutboxConfig {
    fn from(settings: &crate::config::EventSettings) -> Self {
        Self {
            capacity: settings.queue_capacity,
            concurrency: settings.concurrency,
        }
    }
}

/// Producer side of the outbox. Cheap to clone.
#[derive(Clone)]
pub struct EventOutbox {
    tx: mpsc::Sender<EventMessage>,
}

impl EventOutbox {
    /// Spawn the delivery worker and return the producer handle alongside it.
    pub fn start(
        publisher: Arc<dyn EventPublisher>,
        config: OutboxConfig,
    ) -> (Self, OutboxWorker) {
        let (tx, rx) = mpsc::channel(config.capacity.get());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(rx, publisher, config.concurrency.get(), shutdown_rx));

        (
            Self { tx },
            OutboxWorker {
                shutdown: shutdown_tx,
                handle,
            },
        )
    }

    /// Queue a message for delivery. Returns `false` when it was dropped.
    pub fn enqueue(&self, message: EventMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                counter!(METRIC_EVENT_DROPPED).increment(1);
                warn!(
                    target = SOURCE,
                    event_id = %message.id(),
                    entity = message.kind().as_str(),
                    event_key = message.key(),
                    reason = "queue_full",
                    "Event dropped"
                );
                false
            }
            Err(TrySendError::Closed(message)) => {
                counter!(METRIC_EVENT_DROPPED).increment(1);
                warn!(
                    target = SOURCE,
                    event_id = %message.id(),
                    entity = message.kind().as_str(),
                    event_key = message.key(),
                    reason = "outbox_closed",
                    "Event dropped"
                );
                false
            }
        }
    }

    /// Messages currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Handle to the running delivery task. Dropping it closes the queue as if
/// [`OutboxWorker::shutdown`] had been called, without waiting for the drain.
pub struct OutboxWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl OutboxWorker {
    /// Stop accepting messages and deliver what is already queued.
    ///
    /// Returns `true` when the queue drained within `grace`.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let _ = self.shutdown.send(true);
        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(())) => {
                info!(target = SOURCE, "Event outbox drained");
                true
            }
            Ok(Err(err)) => {
                error!(target = SOURCE, error = %err, "Event outbox worker failed");
                false
            }
            Err(_) => {
                warn!(
                    target = SOURCE,
                    grace_ms = grace.as_millis() as u64,
                    "Event outbox did not drain in time; pending events abandoned"
                );
                false
            }
        }
    }
}

async fn run(
    mut rx: mpsc::Receiver<EventMessage>,
    publisher: Arc<dyn EventPublisher>,
    concurrency: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut in_flight = JoinSet::new();
    let mut draining = false;

    loop {
        let next = if draining {
            rx.recv().await
        } else {
            tokio::select! {
                message = rx.recv() => message,
                _ = shutdown.changed() => {
                    draining = true;
                    rx.close();
                    debug!(target = SOURCE, queued = rx.len(), "Event outbox draining");
                    continue;
                }
            }
        };

        let Some(message) = next else {
            break;
        };

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let publisher = publisher.clone();
        in_flight.spawn(async move {
            deliver(publisher.as_ref(), &message).await;
            drop(permit);
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
}

async fn deliver(publisher: &dyn EventPublisher, message: &EventMessage) {
    match publisher.publish(message).await {
        Ok(()) => {
            counter!(METRIC_EVENT_PUBLISHED).increment(1);
            debug!(
                target = SOURCE,
                event_id = %message.id(),
                entity = message.kind().as_str(),
                op = message.op().as_str(),
                event_key = message.key(),
                "Event published"
            );
        }
        Err(err) => {
            counter!(METRIC_EVENT_FAILED).increment(1);
            warn!(
                target = SOURCE,
                event_id = %message.id(),
                entity = message.kind().as_str(),
                event_key = message.key(),
                error = %err,
                "Event delivery failed; event discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::entities::MovieRecord;
    use crate::domain::entity::EntityId;
    use crate::events::publisher::PublishError;

    #[derive(Default)]
    struct Recording {
        payloads: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EventPublisher for Recording {
        async fn ensure_topic(&self) -> Result<(), PublishError> {
            Ok(())
        }

        async fn publish(&self, message: &EventMessage) -> Result<(), PublishError> {
            self.payloads
                .lock()
                .expect("payloads lock")
                .push(message.value().iter().map(|b| *b as char).collect());
            if self.fail {
                Err(PublishError::Delivery("broker unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    struct Stuck;

    #[async_trait]
    impl EventPublisher for Stuck {
        async fn ensure_topic(&self) -> Result<(), PublishError> {
            Ok(())
        }

        async fn publish(&self, _message: &EventMessage) -> Result<(), PublishError> {
            std::future::pending().await
        }
    }

    fn config(capacity: usize, concurrency: usize) -> OutboxConfig {
        OutboxConfig {
            capacity: NonZeroUsize::new(capacity).expect("capacity"),
            concurrency: NonZeroUsize::new(concurrency).expect("concurrency"),
        }
    }

    fn message(id: i64) -> EventMessage {
        EventMessage::deleted::<MovieRecord>(EntityId::new(id))
    }

    #[tokio::test]
    async fn delivers_queued_messages_in_order() {
        let publisher = Arc::new(Recording::default());
        let (outbox, worker) = EventOutbox::start(publisher.clone(), config(8, 1));

        for id in 1..=3 {
            assert!(outbox.enqueue(message(id)));
        }

        assert!(worker.shutdown(Duration::from_secs(5)).await);
        let delivered = publisher.payloads.lock().expect("payloads lock").clone();
        assert_eq!(
            delivered,
            vec![r#"{"id":1}"#, r#"{"id":2}"#, r#"{"id":3}"#]
        );
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (outbox, _worker) = EventOutbox::start(Arc::new(Stuck), config(1, 1));

        // One message in flight, one awaiting a permit, one queued.
        let rejected = (1..=5).filter(|id| !outbox.enqueue(message(*id))).count();
        assert!(rejected >= 2, "rejected {rejected}");
    }

    #[tokio::test]
    async fn delivery_failures_stay_in_the_worker() {
        let publisher = Arc::new(Recording {
            fail: true,
            ..Recording::default()
        });
        let (outbox, worker) = EventOutbox::start(publisher.clone(), config(8, 2));

        assert!(outbox.enqueue(message(1)));
        assert!(outbox.enqueue(message(2)));

        assert!(worker.shutdown(Duration::from_secs(5)).await);
        assert_eq!(publisher.payloads.lock().expect("payloads lock").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_gives_up_after_grace_period() {
        let (outbox, worker) = EventOutbox::start(Arc::new(Stuck), config(4, 1));
        assert!(outbox.enqueue(message(1)));
        tokio::task::yield_now().await;

        assert!(!worker.shutdown(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_rejected() {
        let (outbox, worker) = EventOutbox::start(Arc::new(Recording::default()), config(4, 1));
        assert!(worker.shutdown(Duration::from_secs(1)).await);

        assert!(!outbox.enqueue(message(1)));
    }
}
