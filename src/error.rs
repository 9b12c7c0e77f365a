// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Structured error codes understood by the client error boundary.
/// Any other code on the wire is treated as a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Redirect,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 4] = [
        ErrorCode::Unauthorized,
        ErrorCode::Forbidden,
        ErrorCode::NotFound,
        ErrorCode::Redirect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Redirect => "REDIRECT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or(())
    }
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized,

    // 403 Forbidden
    Forbidden,

    // 404 Not Found
    NotFound(Option<String>),

    // 409 Conflict, the caller must navigate before retrying
    Redirect { url: String },

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Redirect { .. } => StatusCode::CONFLICT,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Structured code, if this error belongs to the client-visible taxonomy
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ApiError::Unauthorized => Some(ErrorCode::Unauthorized),
            ApiError::Forbidden => Some(ErrorCode::Forbidden),
            ApiError::NotFound(_) => Some(ErrorCode::NotFound),
            ApiError::Redirect { .. } => Some(ErrorCode::Redirect),
            _ => None,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self.code() {
            Some(code) => code.as_str(),
            None => match self {
                ApiError::BadRequest(_) => "BAD_REQUEST",
                ApiError::Conflict(_) => "CONFLICT",
                ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
                _ => "INTERNAL_SERVER_ERROR",
            },
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => Some(msg),
            ApiError::NotFound(msg) => msg.as_deref(),
            _ => None,
        }
    }

    /// Error payload as consumed by the client boundary: a bare code string
    /// for the plain taxonomy errors, an object otherwise.
    pub fn to_payload(&self) -> Value {
        match self {
            ApiError::Unauthorized | ApiError::Forbidden | ApiError::NotFound(None) => {
                json!(self.error_code())
            }
            ApiError::Redirect { url } => json!({
                "code": self.error_code(),
                "url": url,
            }),
            _ => json!({
                "code": self.error_code(),
                "message": self.message(),
            }),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.to_payload(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden
    }

    pub fn not_found() -> Self {
        ApiError::NotFound(None)
    }

    pub fn redirect(url: impl Into<String>) -> Self {
        ApiError::Redirect { url: url.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<crate::database::DatabaseError> for ApiError {
    fn from(err: crate::database::DatabaseError) -> Self {
        match err {
            crate::database::DatabaseError::ConfigMissing(_)
            | crate::database::DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            crate::database::DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::auth::AuthPlatformError> for ApiError {
    fn from(err: crate::auth::AuthPlatformError) -> Self {
        use crate::auth::{AuthPlatformError, PlatformRejection};

        match err {
            AuthPlatformError::Api { rejection, message } => match rejection {
                PlatformRejection::Unauthorized => ApiError::Unauthorized,
                PlatformRejection::Forbidden => ApiError::Forbidden,
                PlatformRejection::NotFound => ApiError::NotFound(Some(message)),
                PlatformRejection::BadRequest => ApiError::bad_request(message),
                PlatformRejection::Conflict => ApiError::conflict(message),
            },
            AuthPlatformError::Database(db_err) => db_err.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Redirect { url } => write!(f, "{} -> {}", self.error_code(), url),
            _ => match self.message() {
                Some(msg) => write!(f, "{}: {}", self.error_code(), msg),
                None => f.write_str(self.error_code()),
            },
        }
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
