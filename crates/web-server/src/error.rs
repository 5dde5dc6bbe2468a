use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use database::{DbError, IntegrityKind};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Invalid input: {0}")]
    Validation(#[from] core_types::CoreError),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid username or password")]
    Unauthorized,
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(DbError::Integrity { kind, constraint, .. }) => {
                tracing::info!(%kind, ?constraint, "Write rejected by constraint.");
                let suffix = constraint.map(|c| format!(" ({c})")).unwrap_or_default();
                match kind {
                    IntegrityKind::Unique => {
                        (StatusCode::CONFLICT, format!("Conflicts with existing data{suffix}"))
                    }
                    IntegrityKind::Check => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        format!("Rejected by a check constraint{suffix}"),
                    ),
                    _ => (StatusCode::CONFLICT, format!("Violates a {kind} constraint{suffix}")),
                }
            }
            AppError::Database(DbError::NotFound) => {
                (StatusCode::NOT_FOUND, "The requested resource was not found".to_string())
            }
            AppError::Validation(err) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::Task(task_err) => {
                tracing::error!(error = ?task_err, "Background task error.");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
