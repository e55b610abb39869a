//! Error types for Weft.
//!
//! All errors in Weft are represented by the `WeftError` enum. The variants
//! double as the retriability taxonomy consumed by durable-step substrates:
//! validation, cycle, credential and registry failures must never be retried,
//! while upstream call failures may be.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Weft operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum WeftError {
    /// Engine-level errors (startup, misuse, configuration).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, model parsing).
    #[error("{0}")]
    Convert(String),

    /// Missing or malformed node configuration, or a malformed graph
    /// reference. Never retriable.
    #[error("{0}")]
    Validation(String),

    /// The workflow graph contains a cycle. Never retriable; detected before
    /// any node executes.
    #[error("{0}")]
    Cycle(String),

    /// Credential not found or not owned by the run's owner. Never retriable.
    #[error("{0}")]
    Credential(String),

    /// Failure reported by or while reaching an external service (network
    /// error, non-2xx response, provider error). Retriable by the substrate.
    #[error("{0}")]
    Upstream(String),

    /// No executor registered for a node type. A registry/data consistency
    /// bug, not a user error.
    #[error("{0}")]
    Registry(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Status delivery errors.
    #[error("{0}")]
    Queue(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl WeftError {
    /// Whether the surrounding durable-step substrate may re-attempt the
    /// failing step. The engine itself never retries.
    pub fn is_retriable(&self) -> bool {
        matches!(self, WeftError::Upstream(_) | WeftError::Queue(_) | WeftError::IoError(_))
    }
}

impl From<WeftError> for String {
    fn from(val: WeftError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for WeftError {
    fn from(error: std::io::Error) -> Self {
        WeftError::IoError(error.to_string())
    }
}

impl From<WeftError> for std::io::Error {
    fn from(val: WeftError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for WeftError {
    fn from(error: serde_json::Error) -> Self {
        WeftError::Convert(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for WeftError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        WeftError::Validation(error.to_string())
    }
}

impl From<reqwest::Error> for WeftError {
    fn from(error: reqwest::Error) -> Self {
        WeftError::Upstream(error.to_string())
    }
}
