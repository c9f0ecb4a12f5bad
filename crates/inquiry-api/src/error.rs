use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use inquiry_types::api::ErrorResponse;
use inquiry_types::models::ThreadStatus;

/// Every failure a service or handler can report. Each variant maps to one
/// HTTP status and a stable machine-readable code.
#[derive(Debug, thiserror::Error)]
pub enum InquiryError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid status '{0}': expected APPROVED or REJECTED")]
    InvalidStatus(String),

    #[error("thread is already {from} and cannot become {to}")]
    InvalidTransition {
        from: ThreadStatus,
        to: ThreadStatus,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl InquiryError {
    pub fn thread_not_found() -> Self {
        Self::NotFound("thread not found".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for InquiryError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code: self.code().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for InquiryError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for InquiryError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("invalid query string: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_status_codes() {
        assert_eq!(
            InquiryError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            InquiryError::InvalidStatus("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(InquiryError::thread_not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            InquiryError::InvalidTransition {
                from: ThreadStatus::Approved,
                to: ThreadStatus::Rejected,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            InquiryError::Internal(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn transition_message_names_both_states() {
        let err = InquiryError::InvalidTransition {
            from: ThreadStatus::Rejected,
            to: ThreadStatus::Approved,
        };
        assert_eq!(err.to_string(), "thread is already REJECTED and cannot become APPROVED");
    }
}
