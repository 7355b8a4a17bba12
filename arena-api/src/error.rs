use arena_core::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    /// Malformed path, query or body, as reported by the extractor.
    Rejected { status: StatusCode, message: String },
    Core(CoreError),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::Rejected { status, .. } => *status,
            AppError::Core(err) => match err {
                CoreError::InvalidSortColumn { .. }
                | CoreError::InvalidFilterValue { .. }
                | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::DuplicateInteraction { .. } | CoreError::Conflict(_) => StatusCode::CONFLICT,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::Configuration(_) | CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::AuthenticationError(msg) => json!({ "error": msg }),
            AppError::Rejected { message, .. } => json!({ "error": message }),
            AppError::Core(err) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Internal Server Error: {}", err);
                json!({ "error": "Internal Server Error" })
            }
            AppError::Core(err) => {
                let allowed = err.allowed_values();
                if allowed.is_empty() {
                    json!({ "error": err.to_string() })
                } else {
                    json!({ "error": err.to_string(), "allowed": allowed })
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
