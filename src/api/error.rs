use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// API error type that maps onto HTTP status codes.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - malformed or missing input
    BadRequest(String),
    /// 401 Unauthorized - credentials absent or not recognized
    Unauthorized(String),
    /// 403 Forbidden - credentials present but rejected
    Forbidden(String),
    /// 404 Not Found
    NotFound(String),
    /// 409 Conflict - uniqueness violation
    Conflict(String),
    /// 500 Internal Server Error, with an optional OS-level detail code
    Internal {
        message: String,
        details: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            details: None,
        }
    }

    /// Internal error carrying the OS error code (or the IO error kind
    /// when no code is available) in the `details` field.
    pub fn io(message: impl Into<String>, err: &std::io::Error) -> Self {
        let details = err
            .raw_os_error()
            .map_or_else(|| err.kind().to_string(), |code| code.to_string());
        Self::Internal {
            message: message.into(),
            details: Some(details),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Internal { message, details } => match details {
                Some(details) => write!(f, "Internal error: {message} ({details})"),
                None => write!(f, "Internal error: {message}"),
            },
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message, None),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message, None),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            Self::Conflict(message) => (StatusCode::CONFLICT, message, None),
            Self::Internal { message, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, details)
            }
        };
        let body = ErrorBody {
            error: message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "Internal error");
        Self::internal("An internal error occurred")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
