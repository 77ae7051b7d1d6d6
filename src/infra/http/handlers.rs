use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::application::service::EntityService;
use crate::domain::entity::{Entity, EntityId};

use super::error::{ApiError, repo_to_api};

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub async fn create<E: Entity>(
    State(service): State<EntityService<E>>,
    Json(fields): Json<E::Fields>,
) -> Result<(StatusCode, Json<E>), ApiError> {
    let record = service.create(&fields).await.map_err(repo_to_api)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list<E: Entity>(
    State(service): State<EntityService<E>>,
) -> Result<Json<Vec<E>>, ApiError> {
    service.list().await.map(Json).map_err(repo_to_api)
}

pub async fn fetch<E: Entity>(
    State(service): State<EntityService<E>>,
    Path(id): Path<i64>,
) -> Result<Json<E>, ApiError> {
    service
        .get(EntityId::new(id))
        .await
        .map(Json)
        .map_err(repo_to_api)
}

pub async fn update<E: Entity>(
    State(service): State<EntityService<E>>,
    Path(id): Path<i64>,
    Json(fields): Json<E::Fields>,
) -> Result<Json<E>, ApiError> {
    service
        .update(EntityId::new(id), &fields)
        .await
        .map(Json)
        .map_err(repo_to_api)
}

pub async fn remove<E: Entity>(
    State(service): State<EntityService<E>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    service
        .delete(EntityId::new(id))
        .await
        .map_err(repo_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
