use crate::config;
use spin_sdk::http::Response;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Unavailable,
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unavailable => write!(f, "Database temporarily unavailable"),
            ApiError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

fn error_response(status: u16, message: &str) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({"message": message})).unwrap_or_default())
        .build()
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::BadRequest(msg) => error_response(400, &msg),
            ApiError::Unauthorized => error_response(401, "Unauthorized"),
            ApiError::Forbidden(msg) => error_response(403, &msg),
            ApiError::NotFound(msg) => error_response(404, &msg),
            ApiError::Conflict(msg) => error_response(409, &msg),
            ApiError::Unavailable => {
                error_response(503, "Database temporarily unavailable. Please try again in a moment.")
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                // Detail is suppressed in production mode.
                if config::is_production() {
                    error_response(500, "Something went wrong")
                } else {
                    error_response(500, &msg)
                }
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
