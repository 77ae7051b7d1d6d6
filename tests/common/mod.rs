#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use reelhouse::application::repos::{EntityStore, RepoError};
use reelhouse::application::service::EntityService;
use reelhouse::cache::{CacheError, CachePolicy, CacheStore, MemoryCache};
use reelhouse::domain::entity::{Entity, EntityId};
use reelhouse::events::{
    EventMessage, EventOutbox, EventPublisher, OutboxConfig, OutboxWorker, PublishError,
};

/// Store double that assigns ids from 1 and counts lookups by id.
pub struct InMemoryStore<E: Entity> {
    records: Mutex<BTreeMap<i64, E>>,
    next_id: AtomicUsize,
    reads: AtomicUsize,
    rejecting: AtomicBool,
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            next_id: AtomicUsize::new(1),
            reads: AtomicUsize::new(0),
            rejecting: AtomicBool::new(false),
        }
    }
}

impl<E: Entity> InMemoryStore<E> {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("records lock").len()
    }

    /// Fail every later create and update with a unique-constraint violation.
    pub fn reject_writes(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepoError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for InMemoryStore<E> {
    async fn create(&self, fields: &E::Fields) -> Result<E, RepoError> {
        self.check_writable()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64;
        let record = E::from_parts(EntityId::new(id), fields.clone());
        self.records
            .lock()
            .expect("records lock")
            .insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .expect("records lock")
            .get(&id.get())
            .cloned())
    }

    async fn update(&self, id: EntityId, fields: &E::Fields) -> Result<E, RepoError> {
        self.check_writable()?;
        let mut records = self.records.lock().expect("records lock");
        let slot = records.get_mut(&id.get()).ok_or(RepoError::NotFound)?;
        *slot = E::from_parts(id, fields.clone());
        Ok(slot.clone())
    }

    async fn delete(&self, id: EntityId) -> Result<(), RepoError> {
        self.records
            .lock()
            .expect("records lock")
            .remove(&id.get())
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn list(&self) -> Result<Vec<E>, RepoError> {
        Ok(self
            .records
            .lock()
            .expect("records lock")
            .values()
            .cloned()
            .collect())
    }
}

/// Cache double whose every command fails.
pub struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }
}

/// Cache double that never answers.
pub struct HangingCache;

#[async_trait]
impl CacheStore for HangingCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        std::future::pending().await
    }
}

/// Publisher double that keeps every delivered `(key, value)` pair.
#[derive(Default)]
pub struct RecordingPublisher {
    delivered: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().expect("delivered lock").clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.delivered().into_iter().map(|(key, _)| key).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn ensure_topic(&self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn publish(&self, message: &EventMessage) -> Result<(), PublishError> {
        let value = String::from_utf8_lossy(message.value()).into_owned();
        self.delivered
            .lock()
            .expect("delivered lock")
            .push((message.key().to_string(), value));
        Ok(())
    }
}

/// Publisher double whose deliveries always fail.
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn ensure_topic(&self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn publish(&self, _message: &EventMessage) -> Result<(), PublishError> {
        Err(PublishError::Delivery("broker unavailable".to_string()))
    }
}

/// Publisher double whose deliveries never complete.
pub struct StalledPublisher;

#[async_trait]
impl EventPublisher for StalledPublisher {
    async fn ensure_topic(&self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn publish(&self, _message: &EventMessage) -> Result<(), PublishError> {
        std::future::pending().await
    }
}

pub struct Harness<E: Entity> {
    pub service: EntityService<E>,
    pub store: Arc<InMemoryStore<E>>,
    pub worker: OutboxWorker,
}

pub fn harness<E: Entity>(
    cache: Arc<dyn CacheStore>,
    publisher: Arc<dyn EventPublisher>,
) -> Harness<E> {
    let store = Arc::new(InMemoryStore::<E>::default());
    let config = OutboxConfig {
        concurrency: NonZeroUsize::MIN,
        ..OutboxConfig::default()
    };
    let (outbox, worker) = EventOutbox::start(publisher, config);
    let policy = CachePolicy {
        ttl: Duration::from_secs(86_400),
        operation_timeout: Duration::from_millis(200),
    };
    let service = EntityService::<E>::new(
        store.clone(),
        cache,
        outbox,
        policy,
        Duration::from_secs(5),
    );

    Harness {
        service,
        store,
        worker,
    }
}

pub fn memory_cache() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::default())
}
