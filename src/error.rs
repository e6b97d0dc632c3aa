//! Error types for firecrawl-flow.
//!
//! Only validation and submission failures are hard errors. Everything that
//! can go wrong after a job id exists (timeout, exhausted polling, the job
//! reporting `failed`) is returned as a structured
//! [`TerminalResult`](crate::jobs::TerminalResult) instead.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Request input that cannot be sent as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error(
        "at least one valid URL is required in '{field}'. Provide URLs as a single URL, \
         comma-separated list, one per line, or a JSON array"
    )]
    NoUrls { field: String },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Whether an API error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Network hiccup, 5xx, 429, or a payload we could not read.
    Transient,
    /// Retrying won't help (bad key, unknown job id, rejected body).
    Permanent,
}

/// A single failed call against the Firecrawl REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("{endpoint} rate limited, retry after {retry_after:?}")]
    RateLimited {
        endpoint: String,
        retry_after: Option<Duration>,
    },
}

impl ApiError {
    /// Classify this error for the poller's retry decision.
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Request { .. }
            | ApiError::InvalidResponse { .. }
            | ApiError::RateLimited { .. } => ApiErrorKind::Transient,
            ApiError::Status { status, .. } if *status >= 500 || *status == 408 => {
                ApiErrorKind::Transient
            }
            ApiError::Status { .. } => ApiErrorKind::Permanent,
        }
    }

    /// Server-suggested delay, if the API sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// The initial job submission failed. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{operation} submission rejected: {source}")]
    Rejected {
        operation: String,
        #[source]
        source: ApiError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
