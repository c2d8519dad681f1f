//! Error type definitions for streamgate

use axum::http::StatusCode;
use thiserror::Error;

/// Top-level application error type
///
/// Covers everything that can go wrong before the server is serving requests.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be extracted from its sources
    #[error("Configuration error: {0}")]
    ConfigSource(#[from] Box<figment::Error>),

    /// Configuration was loaded but failed validation
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors while reading or writing configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Default configuration could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of a single manifest request
///
/// Every variant is terminal for the request; the gateway never retries.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No bearer credential could be resolved for the caller
    #[error("Unauthorized")]
    Unauthenticated,

    /// The request is missing `filmId` or carries a malformed parameter
    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },

    /// The media service answered with a non-success status
    #[error("Upstream error: {status} {status_text}")]
    Upstream {
        status: StatusCode,
        status_text: String,
    },

    /// The media service could not be reached
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failures talking to the upstream media service
#[derive(Error, Debug)]
pub enum TransportError {
    /// The composed upstream URL is not valid
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No response within the configured upstream timeout
    #[error("Upstream request timed out: {url}")]
    Timeout { url: String },

    /// Connection could not be established or was reset
    #[error("Failed to connect to upstream {url}: {message}")]
    Connect { url: String, message: String },

    /// Response body could not be read
    #[error("Failed to read upstream body from {url}: {message}")]
    Body { url: String, message: String },
}

impl AppError {
    /// Create a configuration validation error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for AppError {
    fn from(error: figment::Error) -> Self {
        Self::ConfigSource(Box::new(error))
    }
}

impl GatewayError {
    /// Create an invalid request error for a query parameter
    pub fn invalid_request<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status this error is surfaced with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl TransportError {
    /// Classify a reqwest failure for the given upstream URL
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if error.is_body() || error.is_decode() {
            Self::Body {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            Self::Connect {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}
