use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};

use crate::messages;
use crate::state::AppState;
use crate::threads;

/// All inquiry routes. The `/inquiries/{id}` family is the admin side; the
/// `/inquiries/by-slug/{slug}` family is what visitors use. Nothing here
/// authenticates the admin side.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/inquiries", post(threads::create_thread).get(threads::list_threads))
        .route(
            "/inquiries/{id}",
            get(threads::get_thread).patch(threads::update_status),
        )
        .route("/inquiries/{id}/messages", post(messages::post_admin_message))
        .route("/inquiries/by-slug/{slug}", get(threads::get_thread_by_slug))
        .route(
            "/inquiries/by-slug/{slug}/messages",
            post(messages::post_visitor_message),
        )
        .route("/health", get(health))
        .with_state(state)
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
