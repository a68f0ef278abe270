use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use propline_core::error::CoreError;
use propline_core::import::decoder::ParseError;
use propline_core::import::pipeline::ImportError;
use propline_core::import::store::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the core error types and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A request-level domain error from `propline_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The uploaded file could not be imported at all.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// A storage failure outside row processing.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        Self::Import(ImportError::Parse(err))
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- File-level import failures ---
            AppError::Import(ImportError::EmptyFile) => (
                StatusCode::BAD_REQUEST,
                "EMPTY_FILE",
                ImportError::EmptyFile.to_string(),
            ),
            AppError::Import(ImportError::Parse(err)) => match err {
                ParseError::UnsupportedExtension(_) => (
                    StatusCode::BAD_REQUEST,
                    "UNSUPPORTED_FILE_TYPE",
                    err.to_string(),
                ),
                _ => (
                    StatusCode::BAD_REQUEST,
                    "PARSE_ERROR",
                    format!("Failed to parse file: {err}"),
                ),
            },

            // --- Storage ---
            AppError::Store(err) => {
                tracing::error!(error = %err, "Storage error");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
