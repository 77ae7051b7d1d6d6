//! Cache-aside orchestration of one entity kind.
//!
//! Every request goes to the store first; the store is authoritative and its
//! errors are the only ones a caller sees. The cache is refreshed after each
//! successful write and consulted before each read, but any cache failure only
//! degrades to a store round-trip. Successful mutations hand an event to the
//! outbox without waiting for delivery.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, error, warn};

use crate::application::repos::{EntityStore, RepoError};
use crate::cache::{CacheError, CacheKey, CachePolicy, CacheStore};
use crate::domain::entity::{Entity, EntityId};
use crate::events::{EventMessage, EventOp, EventOutbox};

const SOURCE: &str = "reelhouse::application::service";

pub const METRIC_CACHE_HIT: &str = "reelhouse_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "reelhouse_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "reelhouse_cache_error_total";

pub struct EntityService<E: Entity> {
    store: Arc<dyn EntityStore<E>>,
    cache: Arc<dyn CacheStore>,
    events: EventOutbox,
    policy: CachePolicy,
    store_timeout: Duration,
}

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            events: self.events.clone(),
            policy: self.policy,
            store_timeout: self.store_timeout,
        }
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(
        store: Arc<dyn EntityStore<E>>,
        cache: Arc<dyn CacheStore>,
        events: EventOutbox,
        policy: CachePolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            events,
            policy,
            store_timeout,
        }
    }

    pub async fn create(&self, fields: &E::Fields) -> Result<E, RepoError> {
        let record = self.with_store("create", self.store.create(fields)).await?;
        let key = CacheKey::for_entity::<E>(record.id());

        if let Some(snapshot) = encode(&record) {
            self.write_snapshot(&key, &snapshot).await;
            self.events
                .enqueue(EventMessage::snapshot::<E>(EventOp::Create, snapshot));
        }

        Ok(record)
    }

    /// Serve from the cache when possible; otherwise load from the store and
    /// populate the cache before returning.
    pub async fn get(&self, id: EntityId) -> Result<E, RepoError> {
        let key = CacheKey::for_entity::<E>(id);

        if let Some(record) = self.read_snapshot(&key).await {
            return Ok(record);
        }

        let record = self
            .with_store("find_by_id", self.store.find_by_id(id))
            .await?
            .ok_or(RepoError::NotFound)?;

        if let Some(snapshot) = encode(&record) {
            self.write_snapshot(&key, &snapshot).await;
        }

        Ok(record)
    }

    /// Overwrites the cached snapshot rather than invalidating it.
    pub async fn update(&self, id: EntityId, fields: &E::Fields) -> Result<E, RepoError> {
        let record = self
            .with_store("update", self.store.update(id, fields))
            .await?;
        let key = CacheKey::for_entity::<E>(record.id());

        if let Some(snapshot) = encode(&record) {
            self.write_snapshot(&key, &snapshot).await;
            self.events
                .enqueue(EventMessage::snapshot::<E>(EventOp::Update, snapshot));
        }

        Ok(record)
    }

    /// Remove the record, evict its snapshot and announce the deletion.
    ///
    /// An id the store does not know still has its snapshot evicted, but no
    /// event is emitted and `NotFound` is returned.
    pub async fn delete(&self, id: EntityId) -> Result<(), RepoError> {
        let key = CacheKey::for_entity::<E>(id);

        match self.with_store("delete", self.store.delete(id)).await {
            Ok(()) => {
                self.evict_snapshot(&key).await;
                self.events.enqueue(EventMessage::deleted::<E>(id));
                Ok(())
            }
            Err(RepoError::NotFound) => {
                self.evict_snapshot(&key).await;
                Err(RepoError::NotFound)
            }
            Err(err) => Err(err),
        }
    }

    /// Pass-through listing; never cached.
    pub async fn list(&self) -> Result<Vec<E>, RepoError> {
        self.with_store("list", self.store.list()).await
    }

    async fn with_store<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, RepoError> {
        let result = match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RepoError::Timeout),
        };

        if let Err(err) = &result {
            debug!(
                target = SOURCE,
                entity = E::KIND.as_str(),
                op,
                error = %err,
                "Store call failed"
            );
        }

        result
    }

    async fn with_cache<T>(
        &self,
        op: &'static str,
        key: &CacheKey,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Option<T> {
        let result = match tokio::time::timeout(self.policy.operation_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        };

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => op).increment(1);
                warn!(
                    target = SOURCE,
                    entity = E::KIND.as_str(),
                    op,
                    key = key.as_str(),
                    error = %err,
                    "Cache unavailable; continuing with the store"
                );
                None
            }
        }
    }

    async fn read_snapshot(&self, key: &CacheKey) -> Option<E> {
        let cached = self
            .with_cache("get", key, self.cache.get(key.as_str()))
            .await?;

        let Some(bytes) = cached else {
            counter!(METRIC_CACHE_MISS).increment(1);
            return None;
        };

        match serde_json::from_slice::<E>(&bytes) {
            Ok(record) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                Some(record)
            }
            Err(err) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                warn!(
                    target = SOURCE,
                    entity = E::KIND.as_str(),
                    key = key.as_str(),
                    error = %err,
                    "Discarding undecodable snapshot"
                );
                None
            }
        }
    }

    async fn write_snapshot(&self, key: &CacheKey, snapshot: &Bytes) {
        self.with_cache(
            "set",
            key,
            self.cache.set(key.as_str(), snapshot, self.policy.ttl),
        )
        .await;
    }

    async fn evict_snapshot(&self, key: &CacheKey) {
        self.with_cache("delete", key, self.cache.delete(key.as_str()))
            .await;
    }
}

fn encode<E: Entity>(record: &E) -> Option<Bytes> {
    match serde_json::to_vec(record) {
        Ok(bytes) => Some(Bytes::from(bytes)),
        Err(err) => {
            error!(
                target = SOURCE,
                entity = E::KIND.as_str(),
                id = %record.id(),
                error = %err,
                "Failed to serialize record snapshot"
            );
            None
        }
    }
}
