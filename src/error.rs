use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

const UNEXPECTED_ERROR: &str = "An unexpected error has occurred";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Duplicate message uuid")]
    DuplicateKey,
    #[error("Dispatch channel rejected the submission: {0}")]
    DispatchFailure(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Whether retrying the same operation could succeed.
    ///
    /// Connection and pool faults are transient; data and constraint errors are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(e) => is_transient_db_error(e),
            _ => false,
        }
    }
}

fn is_transient_db_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_transient_sqlstate(&code)),
        _ => false,
    }
}

/// SQLSTATE classes worth retrying: connection exceptions (08), transaction rollbacks
/// such as serialization failures and deadlocks (40), insufficient resources (53) and
/// operator intervention like admin shutdown (57P).
fn is_transient_sqlstate(code: &str) -> bool {
    ["08", "40", "53", "57P"].iter().any(|class| code.starts_with(class))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR.to_string())
            }
            Self::DuplicateKey => {
                tracing::error!("Duplicate key surfaced at the HTTP boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR.to_string())
            }
            Self::DispatchFailure(reason) => {
                tracing::error!(reason = %reason, "Dispatch failure");
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable".to_string())
            }
            Self::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Self::MethodNotAllowed => {
                tracing::debug!("Method not allowed");
                (
                    StatusCode::METHOD_NOT_ALLOWED,
                    "The requested method is not supported for this endpoint".to_string(),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
