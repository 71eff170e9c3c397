//! Error handling for the civic-connect client

use std::fmt;
use thiserror::Error;

/// Result alias used by every operation in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the data access layer
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any network call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identity provider rejections, surfaced verbatim
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Non-success response from a remote collaborator
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Lookup by id returned no row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor lacks the role required for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Issue status change outside the lifecycle DAG
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The device refused a capability the user asked for, such as location
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Media host failures
    #[error("Upload error: {0}")]
    Upload(String),

    /// Geocoding provider failures
    #[error("Geocoding error: {0}")]
    Geocode(String),

    /// A multi-step operation failed after an earlier step took effect
    #[error("{step} failed: {source}{}", compensation_suffix(.compensation))]
    PartialFailure {
        step: &'static str,
        source: Box<Error>,
        compensation: Option<Box<Error>>,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

fn compensation_suffix(compensation: &Option<Box<Error>>) -> String {
    match compensation {
        Some(err) => format!(" (compensation also failed: {})", err),
        None => String::new(),
    }
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new not-found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    /// Create a new forbidden error
    pub fn forbidden<T: fmt::Display>(msg: T) -> Self {
        Error::Forbidden(msg.to_string())
    }

    /// Create a new permission-denied error
    pub fn permission_denied<T: fmt::Display>(msg: T) -> Self {
        Error::PermissionDenied(msg.to_string())
    }

    /// Create a new upload error
    pub fn upload<T: fmt::Display>(msg: T) -> Self {
        Error::Upload(msg.to_string())
    }

    /// Create a new geocoding error
    pub fn geocode<T: fmt::Display>(msg: T) -> Self {
        Error::Geocode(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create an API error from a status code and message
    pub fn api<T: fmt::Display>(status: u16, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// True when the error was raised before any remote call
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for `Error::NotFound` and 404/406 API responses
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Api { status, .. } => *status == 404 || *status == 406,
            _ => false,
        }
    }
}
