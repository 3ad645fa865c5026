//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for docpress
///
/// Every failure that crosses a component boundary is one of these variants.
/// The workspace client maps raw HTTP failures into this taxonomy before they
/// reach the orchestrator; handlers map variants to response codes via
/// [`Error::kind`].
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request, oversized source, or schema failure
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what was rejected
        message: String,
    },

    /// Missing or rejected workspace bearer token
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of the auth failure
        message: String,
    },

    /// Target object gone from the workspace
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Workspace rate limit exhausted after retries
    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited {
        /// Retry hint from the workspace, if any
        retry_after_secs: Option<u64>,
    },

    /// Retryable workspace or network failure (5xx, 408, 425, reset, timeout)
    #[error("Transient workspace error: {message}")]
    Transient {
        /// Description of the transient failure
        message: String,
    },

    /// Workspace reported a save conflict; safe to retry
    #[error("Workspace conflict: {message}")]
    Conflict {
        /// Conflict detail from the workspace
        message: String,
    },

    /// Workspace rejected the payload against its schema
    #[error("Workspace rejected payload: {message}")]
    Validation {
        /// Schema complaint from the workspace
        message: String,
    },

    /// Request or job deadline expired
    #[error("Timeout: {message}")]
    Timeout {
        /// What timed out
        message: String,
    },

    /// Job was cancelled by the caller
    #[error("Cancelled: {message}")]
    Cancelled {
        /// Cancellation context
        message: String,
    },

    /// Permanent, non-retryable workspace failure
    #[error("Workspace error: {message}")]
    Workspace {
        /// Description of the workspace failure
        message: String,
    },

    /// Purge phase could not empty the target page
    #[error("Purge incomplete: {remaining} children remain after {attempts} attempts")]
    PurgeIncomplete {
        /// Children still present after the last list
        remaining: usize,
        /// List/delete rounds performed
        attempts: usize,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key that is invalid
        key: String,
        /// Reason why it is invalid
        message: String,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal failure
        message: String,
    },
}

/// Stable wire-level error kind
///
/// Serialized into the response envelope's `error.code` field. The set is
/// deliberately small and stable; internal variants collapse onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 400
    InvalidInput,
    /// 401
    Unauthorized,
    /// 404
    NotFound,
    /// 429
    RateLimited,
    /// 504
    Timeout,
    /// 502
    WorkspaceError,
    /// 500
    Internal,
}

impl ErrorKind {
    /// Wire code for the response envelope
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::WorkspaceError => "workspace_error",
            Self::Internal => "internal",
        }
    }
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a transient error
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a workspace validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a cancelled error
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Create a permanent workspace error
    pub fn workspace<S: Into<String>>(message: S) -> Self {
        Self::Workspace {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the orchestrator may retry the failed operation
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Conflict { .. })
    }

    /// Stable wire kind for the response envelope
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::Validation { .. }
            | Self::Json { .. }
            | Self::Config { .. }
            | Self::ConfigInvalid { .. } => ErrorKind::InvalidInput,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Transient { .. }
            | Self::Conflict { .. }
            | Self::Workspace { .. }
            | Self::PurgeIncomplete { .. } => ErrorKind::WorkspaceError,
            Self::Cancelled { .. } | Self::Io { .. } | Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_variants() {
        assert!(Error::transient("reset").is_retryable());
        assert!(Error::conflict("conflict_error").is_retryable());
        assert!(!Error::validation("bad payload").is_retryable());
        assert!(!Error::not_found("page").is_retryable());
        assert!(!Error::RateLimited {
            retry_after_secs: Some(1)
        }
        .is_retryable());
    }

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(Error::invalid_input("x").kind().code(), "invalid_input");
        assert_eq!(Error::unauthorized("x").kind().code(), "unauthorized");
        assert_eq!(Error::not_found("x").kind().code(), "not_found");
        assert_eq!(Error::timeout("x").kind().code(), "timeout");
        assert_eq!(Error::workspace("x").kind().code(), "workspace_error");
        assert_eq!(Error::internal("x").kind().code(), "internal");
    }
}
