//! Serving one entity kind until shutdown, then flushing pending events.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::application::repos::EntityStore;
use crate::application::service::EntityService;
use crate::cache::CachePolicy;
use crate::config::Settings;
use crate::domain::entity::Entity;
use crate::events::{EventOutbox, OutboxConfig};

use super::db::PostgresRepositories;
use super::deps::Dependencies;
use super::error::InfraError;
use super::http;

const SOURCE: &str = "reelhouse::serve";

/// Serve `E` on `settings.server.addr` until `shutdown` resolves.
///
/// The listener is bound before any background work starts. The store pool is
/// closed on every exit path.
pub async fn serve<E, F>(
    settings: &Settings,
    deps: Dependencies,
    shutdown: F,
) -> Result<(), InfraError>
where
    E: Entity,
    PostgresRepositories: EntityStore<E>,
    F: Future<Output = ()> + Send + 'static,
{
    let listener = match TcpListener::bind(settings.server.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            deps.store.pool().close().await;
            return Err(InfraError::from(err));
        }
    };

    let (outbox, worker) =
        EventOutbox::start(deps.publisher.clone(), OutboxConfig::from(&settings.events));

    let store: Arc<dyn EntityStore<E>> = Arc::new(deps.store.clone());
    let service = EntityService::<E>::new(
        store,
        deps.cache.clone(),
        outbox.clone(),
        CachePolicy::from(&settings.cache),
        settings.database.statement_timeout,
    );
    let router = http::build_router(service);

    info!(
        target = SOURCE,
        service = E::KIND.as_str(),
        addr = %settings.server.addr,
        "Accepting requests"
    );

    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(InfraError::from);

    info!(
        target = SOURCE,
        queued = outbox.queued(),
        "Flushing pending events"
    );
    drop(outbox);
    if worker.shutdown(settings.server.graceful_shutdown).await {
        info!(target = SOURCE, "Pending events flushed");
    } else {
        warn!(
            target = SOURCE,
            "Shutdown continued with undelivered events"
        );
    }
    deps.store.pool().close().await;

    served
}
