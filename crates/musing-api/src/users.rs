use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use musing_types::api::{CreateUserRequest, UpdateUserRequest};
use musing_types::models::User;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.coordinator.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.coordinator.get_user(id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.coordinator.create_user(req).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
    WithRejection(Json(req), _): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.coordinator.update_user(id, req).await?))
}

/// Responds with the deleted record. Thoughts the user wrote are kept.
pub async fn delete_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.coordinator.delete_user(id).await?))
}

pub async fn add_friend(
    State(state): State<AppState>,
    WithRejection(Path((user_id, friend_id)), _): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.coordinator.add_friend(user_id, friend_id).await?))
}

pub async fn remove_friend(
    State(state): State<AppState>,
    WithRejection(Path((user_id, friend_id)), _): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.coordinator.remove_friend(user_id, friend_id).await?))
}
