//! Error types for sluice-extract
//!
//! Classifies failures so the orchestration layer can decide what to
//! retry:
//! - Retriable errors (source unreachable)
//! - Non-retriable errors (malformed checkpoint values, configuration)
//!
//! An empty delta (no rows beyond the checkpoint) is not an error; it
//! is reported as a successful [`RunStatus::EmptyDelta`] outcome.
//!
//! [`RunStatus::EmptyDelta`]: crate::engine::RunStatus::EmptyDelta

use thiserror::Error;

use crate::value::ValueKind;

/// Result type for sluice-extract operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sluice-extract
#[derive(Error, Debug)]
pub enum Error {
    /// A checkpoint or boundary value could not be parsed for its
    /// declared kind. Fatal: no extraction is attempted.
    #[error("malformed {kind} value: {text:?}")]
    MalformedValue {
        /// Declared check-column kind
        kind: ValueKind,
        /// The text that failed to parse
        text: String,
    },

    /// The source could not be reached for the boundary query or a
    /// worker's extraction query. Retryable by the orchestration
    /// layer; the checkpoint is untouched.
    #[error("source unavailable: {message}")]
    SourceUnavailable {
        /// Description of the failure
        message: String,
        /// Underlying driver error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// One or more partition workers failed after others succeeded.
    /// The checkpoint is untouched; rows already written by the
    /// succeeded partitions remain on the destination.
    #[error("partial failure: {failed} of {total} partitions failed ({})", .reasons.join("; "))]
    PartialFailure {
        /// Number of failed partitions
        failed: usize,
        /// Total number of partitions in the run
        total: usize,
        /// Failure reasons, one per failed partition
        reasons: Vec<String>,
        /// Whether every failure was a transient source outage
        retriable: bool,
    },

    /// The destination sink rejected a write
    #[error("sink error: {message}")]
    Sink {
        /// Description of the failure
        message: String,
    },

    /// Invalid run configuration (bad partition count, missing column)
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
    },

    /// Invariant breach inside the engine, e.g. comparing values of
    /// different kinds
    #[error("internal error: {message}")]
    Internal {
        /// Description of the breach
        message: String,
    },
}

impl Error {
    /// Whether the orchestration layer may retry the whole run
    #[inline]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::SourceUnavailable { .. } => true,
            Self::PartialFailure { retriable, .. } => *retriable,
            _ => false,
        }
    }

    /// Create a source-unavailable error
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a source-unavailable error with the driver error attached
    pub fn source_unavailable_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a malformed-value error
    pub fn malformed(kind: ValueKind, text: impl Into<String>) -> Self {
        Self::MalformedValue {
            kind,
            text: text.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
