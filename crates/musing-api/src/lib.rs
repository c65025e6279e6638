pub mod coordinator;
pub mod error;
pub mod extract;
pub mod reactions;
pub mod state;
pub mod thoughts;
pub mod users;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use crate::state::AppState;

/// All API routes, with state applied. Layers (tracing, CORS) are added by
/// the server binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/thoughts",
            get(thoughts::list_thoughts).post(thoughts::create_thought),
        )
        .route(
            "/api/thoughts/{id}",
            get(thoughts::get_thought)
                .put(thoughts::update_thought)
                .delete(thoughts::delete_thought),
        )
        .route("/api/thoughts/{id}/reactions", post(reactions::add_reaction))
        .route(
            "/api/thoughts/{id}/reactions/{reaction_id}",
            delete(reactions::remove_reaction),
        )
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/users/{id}/friends/{friend_id}",
            post(users::add_friend).delete(users::remove_friend),
        )
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
