//! REST surface of one entity service.

mod error;
mod handlers;
mod middleware;

pub use error::{ApiError, ApiErrorBody, codes, repo_to_api};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::service::EntityService;
use crate::domain::entity::{Entity, EntityKind};

use middleware::{log_responses, set_request_context};

/// Collection path for a kind; item routes live under `<collection>/{id}`.
pub fn collection_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Movie => "/movies",
        EntityKind::User => "/users",
    }
}

pub fn build_router<E: Entity>(service: EntityService<E>) -> Router {
    let collection = collection_path(E::KIND);
    let item = format!("{collection}/{{id}}");

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(
            collection,
            get(handlers::list::<E>).post(handlers::create::<E>),
        )
        .route(
            &item,
            get(handlers::fetch::<E>)
                .put(handlers::update::<E>)
                .delete(handlers::remove::<E>),
        );

    if E::KIND == EntityKind::User {
        router = router.route("/users/register", post(handlers::create::<E>));
    }

    router
        .with_state(service)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
