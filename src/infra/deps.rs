//! Startup sequence: store, then cache, then event log.
//!
//! Each dependency goes through the bounded-retry connector. The first one
//! that cannot be reached ends the sequence with a fatal error.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::application::bootstrap::{
    BootstrapError, ConnectionTarget, RetryPolicy, StartupDependency, establish_in_order,
};
use crate::cache::{CacheError, CacheStore};
use crate::config::{CacheSettings, DatabaseSettings, EventSettings, Settings};
use crate::events::{EventPublisher, PublishError};

use super::db::PostgresRepositories;
use super::kafka::KafkaPublisher;
use super::redis::RedisCache;

const SOURCE: &str = "reelhouse::infra::deps";

/// Process-wide handles, built once and shared read-only afterwards.
pub struct Dependencies {
    pub store: PostgresRepositories,
    pub cache: Arc<dyn CacheStore>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl Dependencies {
    pub async fn establish(settings: &Settings) -> Result<Self, BootstrapError> {
        let policy = RetryPolicy::from(&settings.bootstrap);

        let store = PostgresStartup {
            database: &settings.database,
        };
        let cache = RedisStartup::new(&settings.cache)?;
        let log = KafkaStartup::new(&settings.events)?;

        let (pool, cache, publisher) = establish_in_order(&store, &cache, &log, policy).await?;

        info!(
            target = SOURCE,
            service = settings.service.as_str(),
            topic = publisher.topic(),
            "All dependencies ready"
        );

        Ok(Self {
            store: PostgresRepositories::new(pool),
            cache,
            publisher,
        })
    }
}

struct PostgresStartup<'a> {
    database: &'a DatabaseSettings,
}

#[async_trait]
impl<'a> StartupDependency for PostgresStartup<'a> {
    type Handle = PgPool;
    type Error = sqlx::Error;

    fn target(&self) -> ConnectionTarget {
        ConnectionTarget::new("store", &self.database.url)
    }

    async fn probe(&self) -> Result<PgPool, sqlx::Error> {
        let pool = PostgresRepositories::connect(
            &self.database.url,
            self.database.max_connections.get(),
            self.database.acquire_timeout,
        )
        .await?;
        let health = PostgresRepositories::new(pool.clone()).health_check().await;
        keep_if_healthy(pool, health).await
    }

    async fn prepare(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        PostgresRepositories::run_migrations(pool).await
    }
}

/// Hand the pool back when the health check passed; close it otherwise.
async fn keep_if_healthy(
    pool: PgPool,
    health: Result<(), sqlx::Error>,
) -> Result<PgPool, sqlx::Error> {
    match health {
        Ok(()) => Ok(pool),
        Err(err) => {
            pool.close().await;
            Err(err)
        }
    }
}

struct RedisStartup {
    target: ConnectionTarget,
    cache: Arc<RedisCache>,
}

impl RedisStartup {
    fn new(settings: &CacheSettings) -> Result<Self, BootstrapError> {
        let cache = RedisCache::new(&settings.url, settings.pool_size, settings.operation_timeout)
            .map_err(|err| BootstrapError::setup("cache", err.to_string()))?;

        Ok(Self {
            target: ConnectionTarget::new("cache", &settings.url),
            cache: Arc::new(cache),
        })
    }
}

#[async_trait]
impl StartupDependency for RedisStartup {
    type Handle = Arc<dyn CacheStore>;
    type Error = CacheError;

    fn target(&self) -> ConnectionTarget {
        self.target.clone()
    }

    async fn probe(&self) -> Result<Arc<dyn CacheStore>, CacheError> {
        self.cache.ping().await?;
        let cache: Arc<dyn CacheStore> = self.cache.clone();
        Ok(cache)
    }
}

struct KafkaStartup {
    target: ConnectionTarget,
    publisher: Arc<KafkaPublisher>,
}

impl KafkaStartup {
    fn new(settings: &EventSettings) -> Result<Self, BootstrapError> {
        let publisher = KafkaPublisher::new(
            &settings.brokers,
            settings.topic.clone(),
            settings.delivery_timeout,
        )
        .map_err(|err| BootstrapError::setup("event log", err.to_string()))?;

        Ok(Self {
            target: ConnectionTarget::new("event log", &settings.brokers),
            publisher: Arc::new(publisher),
        })
    }
}

#[async_trait]
impl StartupDependency for KafkaStartup {
    type Handle = Arc<KafkaPublisher>;
    type Error = PublishError;

    fn target(&self) -> ConnectionTarget {
        self.target.clone()
    }

    /// Reachable once the cluster answers and the topic exists.
    async fn probe(&self) -> Result<Arc<KafkaPublisher>, PublishError> {
        self.publisher.probe().await?;
        self.publisher.ensure_topic().await?;
        Ok(self.publisher.clone())
    }
}
