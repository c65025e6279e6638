use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use musing_types::api::AddReactionRequest;
use musing_types::models::Thought;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub async fn add_reaction(
    State(state): State<AppState>,
    WithRejection(Path(thought_id), _): ApiPath<Uuid>,
    WithRejection(Json(req), _): ApiJson<AddReactionRequest>,
) -> Result<Json<Thought>, ApiError> {
    Ok(Json(state.coordinator.add_reaction(thought_id, req).await?))
}

/// Unknown reaction ids are not an error; the thought comes back unchanged.
pub async fn remove_reaction(
    State(state): State<AppState>,
    WithRejection(Path((thought_id, reaction_id)), _): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<Thought>, ApiError> {
    Ok(Json(
        state
            .coordinator
            .remove_reaction(thought_id, reaction_id)
            .await?,
    ))
}
