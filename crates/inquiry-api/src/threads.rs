use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use inquiry_types::api::{
    CreateThreadRequest, CreateThreadResponse, ListThreadsQuery, UpdateStatusRequest,
};
use inquiry_types::models::ThreadStatus;

use crate::error::InquiryError;
use crate::lifecycle::ThreadRef;
use crate::state::{AppState, run_blocking};

/// POST /inquiries — a visitor submits the contact form.
pub async fn create_thread(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateThreadRequest>, InquiryError>,
) -> Result<impl IntoResponse, InquiryError> {
    let slug = run_blocking(move || {
        state.lifecycle.create_thread(
            req.name.as_deref().unwrap_or_default(),
            req.email.as_deref().unwrap_or_default(),
            req.body.as_deref().unwrap_or_default(),
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(CreateThreadResponse { slug })))
}

/// GET /inquiries?status= — admin list, PENDING unless another valid status is asked for.
pub async fn list_threads(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListThreadsQuery>, InquiryError>,
) -> Result<impl IntoResponse, InquiryError> {
    let status = ThreadStatus::from_query(query.status.as_deref());
    let threads = run_blocking(move || state.lifecycle.list_threads(status)).await?;
    Ok(Json(threads))
}

/// GET /inquiries/{id}
pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, InquiryError> {
    let thread = run_blocking(move || state.lifecycle.get_thread(ThreadRef::Id(&id))).await?;
    Ok(Json(thread))
}

/// GET /inquiries/by-slug/{slug}
pub async fn get_thread_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, InquiryError> {
    let thread = run_blocking(move || state.lifecycle.get_thread(ThreadRef::Slug(&slug))).await?;
    Ok(Json(thread))
}

/// PATCH /inquiries/{id} — body `{ "newStatus": "APPROVED" | "REJECTED" }`.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateStatusRequest>, InquiryError>,
) -> Result<impl IntoResponse, InquiryError> {
    let thread = run_blocking(move || {
        state
            .lifecycle
            .update_status(&id, req.new_status.as_deref())
    })
    .await?;
    Ok(Json(thread))
}
