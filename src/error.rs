use std::error::Error;
use std::fmt;

use serde::Serialize;
use warp::http::StatusCode;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub field: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
        }
    }
}

#[derive(Debug)]
pub enum SiteWorkError {
    // Request errors
    Validation(Vec<FieldError>),
    BadRequest(String),
    PayloadTooLarge(u64),

    // Auth errors
    AuthError(String),
    Unauthorized,
    Forbidden,
    RateLimited,

    // Resource errors
    NotFound(String),
    Conflict(String),

    // Storage errors
    StorageError(String),

    // System errors
    SystemError(String),

    // Configuration errors
    ConfigError(String),
}

impl SiteWorkError {
    /// Shorthand for a validation error on a single field
    pub fn invalid_field(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::AuthError(_) | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StorageError(_) | Self::SystemError(_) | Self::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the client. Internal failures stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::StorageError(_) | Self::SystemError(_) | Self::ConfigError(_) => {
                "Internal server error".to_string()
            }
            Self::AuthError(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::NotFound(what) => format!("{} not found", what),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for SiteWorkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "Validation failed on {} field(s)", errors.len()),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::PayloadTooLarge(limit) => write!(f, "Payload exceeds {} bytes", limit),
            Self::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            Self::Unauthorized => write!(f, "Authentication required"),
            Self::Forbidden => write!(f, "Forbidden: insufficient permissions"),
            Self::RateLimited => write!(f, "Too many attempts, please try again later"),
            Self::NotFound(what) => write!(f, "{} not found", what),
            Self::Conflict(msg) => write!(f, "{}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::SystemError(msg) => write!(f, "System error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for SiteWorkError {}

impl From<reqwest::Error> for SiteWorkError {
    fn from(err: reqwest::Error) -> Self {
        SiteWorkError::StorageError(format!("Database request failed: {}", err))
    }
}

impl From<std::io::Error> for SiteWorkError {
    fn from(err: std::io::Error) -> Self {
        SiteWorkError::SystemError(format!("I/O error: {}", err))
    }
}

// Generic result type for SiteWork
pub type Result<T> = std::result::Result<T, SiteWorkError>;
