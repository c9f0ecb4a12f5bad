use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use inquiry_types::api::PostMessageRequest;

use crate::error::InquiryError;
use crate::state::{AppState, run_blocking};

/// POST /inquiries/{id}/messages — administrator reply.
pub async fn post_admin_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<PostMessageRequest>, InquiryError>,
) -> Result<impl IntoResponse, InquiryError> {
    let message = run_blocking(move || {
        state
            .messaging
            .post_admin_message(&id, req.body.as_deref().unwrap_or_default())
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /inquiries/by-slug/{slug}/messages — visitor reply.
pub async fn post_visitor_message(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<PostMessageRequest>, InquiryError>,
) -> Result<impl IntoResponse, InquiryError> {
    let message = run_blocking(move || {
        state
            .messaging
            .post_visitor_message(&slug, req.body.as_deref().unwrap_or_default())
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
