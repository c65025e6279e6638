use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use musing_types::api::{CreateThoughtRequest, UpdateThoughtRequest};
use musing_types::models::{Thought, User};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// GET /api/thoughts, newest first.
pub async fn list_thoughts(State(state): State<AppState>) -> Result<Json<Vec<Thought>>, ApiError> {
    Ok(Json(state.coordinator.list_thoughts().await?))
}

pub async fn get_thought(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<Thought>, ApiError> {
    Ok(Json(state.coordinator.get_thought(id).await?))
}

/// POST /api/thoughts. Responds with the author's updated user record.
/// A 404 here still leaves the new thought in place.
pub async fn create_thought(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<CreateThoughtRequest>,
) -> Result<Json<User>, ApiError> {
    let outcome = state.coordinator.create_thought(req).await?;
    Ok(Json(outcome.into_user()?))
}

pub async fn update_thought(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
    WithRejection(Json(req), _): ApiJson<UpdateThoughtRequest>,
) -> Result<Json<Thought>, ApiError> {
    Ok(Json(state.coordinator.update_thought(id, req).await?))
}

/// DELETE /api/thoughts/{id}. Responds with the author's updated user record.
pub async fn delete_thought(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<User>, ApiError> {
    let outcome = state.coordinator.delete_thought(id).await?;
    Ok(Json(outcome.into_user()?))
}
