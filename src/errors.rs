use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use crate::api_types::ApiErrorResponse;
use crate::models::service::ServiceStatus;
use crate::models::workflow::WorkflowAction;

#[derive(Debug)]
pub enum AppError {
    /// The action's precondition does not hold for the current status.
    InvalidTransition {
        from: Option<ServiceStatus>,
        action: WorkflowAction,
    },
    Validation {
        field: &'static str,
        message: String,
    },
    NotFound,
    PermissionDenied(String),
    /// Unknown role or permission token in an override write.
    Configuration(String),
    /// Optimistic concurrency check failed.
    Conflict(String),
    Session(String),
    Store(String),
    Db(rusqlite::Error),
    Pool(r2d2::Error),
    Json(serde_json::Error),
    Hash(String),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation { field, message: message.into() }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidTransition { from, action } => match from {
                Some(status) => write!(f, "Invalid transition: cannot {} from {}", action, status),
                None => write!(f, "Invalid transition: cannot {} from an unset status", action),
            },
            AppError::Validation { field, message } => write!(f, "Validation error on {field}: {message}"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::PermissionDenied(e) => write!(f, "Permission denied: {e}"),
            AppError::Configuration(e) => write!(f, "Configuration error: {e}"),
            AppError::Conflict(e) => write!(f, "Conflict: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Store(e) => write!(f, "Store error: {e}"),
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Pool(e) => write!(f, "Pool error: {e}"),
            AppError::Json(e) => write!(f, "JSON error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Configuration(_) => StatusCode::BAD_REQUEST,
            AppError::Session(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(_)
            | AppError::Db(_)
            | AppError::Pool(_)
            | AppError::Json(_)
            | AppError::Hash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
            return HttpResponse::build(status).json(ApiErrorResponse {
                error: "Internal Server Error".to_string(),
                details: None,
            });
        }

        let details = match self {
            AppError::Validation { field, .. } => Some(field.to_string()),
            _ => None,
        };
        HttpResponse::build(status).json(ApiErrorResponse {
            error: self.to_string(),
            details,
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Pool(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Store(e.to_string())
    }
}
