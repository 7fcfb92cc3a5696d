// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for symbolic-path client operations.
//!
//! Absence of a node is NOT an error: navigation returns `Option::None` and
//! per-path write failures are collected into the batch result. Only errors
//! that invalidate the whole session (connection establishment, root
//! resolution, invalid configuration) travel through this hierarchy.
//!
//! # Error Categories
//!
//! ```text
//! ClientError
//! ├── Connection    - Transport and session establishment issues
//! ├── Operation     - Read/write round-trip failures
//! ├── Codec         - Value encode/decode failures
//! ├── Configuration - Invalid settings
//! └── Timeout       - Deadline exceeded
//! ```

use std::time::Duration;

use thiserror::Error;

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// =============================================================================
// ClientError - Main Error Type
// =============================================================================

/// The main error type for symbolic-path client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-related errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Read/write operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Value encode/decode errors.
    #[error("{0}")]
    Codec(#[from] CodecError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Timeout errors.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),
}

impl ClientError {
    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Creates a codec error.
    #[inline]
    pub fn codec(error: CodecError) -> Self {
        Self::Codec(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a not connected error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    /// Creates a connect timeout error.
    pub fn connect_timeout(duration: Duration) -> Self {
        Self::Timeout(TimeoutError::Connect { duration })
    }

    /// Creates a read failed error.
    pub fn read_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation(OperationError::read_failed(node, message))
    }

    /// Creates a write failed error.
    pub fn write_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation(OperationError::write_failed(node, message))
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::Codec(CodecError::type_mismatch(expected, actual))
    }

    /// Returns `true` if this error is retryable.
    ///
    /// Retryable errors are transient issues that may succeed on a later
    /// attempt; codec and configuration errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Operation(_) | Self::Timeout(_) => true,
            Self::Codec(_) | Self::Configuration(_) => false,
        }
    }

    /// Returns `true` if this error is fatal for the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Configuration(_))
    }

    /// Returns the error category for logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Operation(_) => "operation",
            Self::Codec(_) => "codec",
            Self::Configuration(_) => "configuration",
            Self::Timeout(_) => "timeout",
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Session and endpoint establishment errors.
///
/// Fatal for the session: the caller gets them from `connect`, never from a
/// read or write path that already holds a session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The endpoint refused the connection.
    #[error("Connection refused by endpoint '{endpoint}'")]
    Refused {
        /// The endpoint that refused.
        endpoint: String,
    },

    /// No connection is currently established.
    #[error("Not connected to server")]
    NotConnected,

    /// The configured root object could not be resolved in the address space.
    #[error("Root object '{name}' not found within search depth")]
    RootObjectNotFound {
        /// Name of the missing root object.
        name: String,
    },

    /// The transport reported a protocol-level failure.
    #[error("Transport failure: {message}")]
    Transport {
        /// Failure description from the transport.
        message: String,
    },
}

impl ConnectionError {
    /// Creates a connection refused error.
    pub fn refused(endpoint: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a root-object-not-found error.
    pub fn root_not_found(name: impl Into<String>) -> Self {
        Self::RootObjectNotFound { name: name.into() }
    }

    /// Creates a transport failure error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Refused { .. } | Self::Transport { .. })
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Read/write round-trip errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Reading a node value failed.
    #[error("Read failed for node '{node}': {message}")]
    ReadFailed {
        /// The node being read.
        node: String,
        /// Failure description.
        message: String,
    },

    /// Writing a node value failed.
    #[error("Write failed for node '{node}': {message}")]
    WriteFailed {
        /// The node being written.
        node: String,
        /// Failure description.
        message: String,
    },

    /// Browsing a node's children failed.
    #[error("Browse failed for node '{node}': {message}")]
    BrowseFailed {
        /// The node being browsed.
        node: String,
        /// Failure description.
        message: String,
    },
}

impl OperationError {
    /// Creates a read failed error.
    pub fn read_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Creates a write failed error.
    pub fn write_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Creates a browse failed error.
    pub fn browse_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrowseFailed {
            node: node.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// CodecError
// =============================================================================

/// Value encode/decode errors.
///
/// These surface only from `encode`: decode is best-effort and falls back to
/// passthrough when metadata is incomplete.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input value's type cannot be converted to the target type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The server-declared target type.
        expected: String,
        /// The input value's type.
        actual: String,
    },

    /// A numeric value does not fit the target width/signedness.
    #[error("Value {value} out of range for {target}")]
    OutOfRange {
        /// String rendering of the offending value.
        value: String,
        /// Name of the target type.
        target: String,
    },

    /// The input shape is not writable (e.g. a nested mapping).
    #[error("Unsupported value shape: {message}")]
    Unsupported {
        /// Description of the unsupported shape.
        message: String,
    },
}

impl CodecError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self::OutOfRange {
            value: value.into(),
            target: target.into(),
        }
    }

    /// Creates an unsupported shape error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required setting is empty or missing.
    #[error("Missing required setting: {setting}")]
    Missing {
        /// Name of the missing setting.
        setting: String,
    },

    /// A setting holds an invalid value.
    #[error("Invalid value for {setting}: {message}")]
    Invalid {
        /// Name of the offending setting.
        setting: String,
        /// Why the value is invalid.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates a missing setting error.
    pub fn missing(setting: impl Into<String>) -> Self {
        Self::Missing {
            setting: setting.into(),
        }
    }

    /// Creates an invalid setting error.
    pub fn invalid(setting: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            setting: setting.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// TimeoutError
// =============================================================================

/// Deadline exceeded on an operation.
#[derive(Debug, Error)]
pub enum TimeoutError {
    /// Connection establishment (including root resolution) timed out.
    #[error("Connect timed out after {duration:?}")]
    Connect {
        /// The configured deadline.
        duration: Duration,
    },

    /// A read/write request timed out.
    #[error("Request timed out after {duration:?}")]
    Request {
        /// The configured deadline.
        duration: Duration,
    },
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = ClientError::not_connected();
        assert_eq!(err.category(), "connection");
        assert!(err.is_fatal());

        let err = ClientError::type_mismatch("Int32", "String");
        assert_eq!(err.category(), "codec");
        assert!(!err.is_retryable());

        let err = ClientError::read_failed("ns=2;i=10", "bad status");
        assert_eq!(err.category(), "operation");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::connection(ConnectionError::root_not_found("ePAC:Project"));
        assert!(err.to_string().contains("ePAC:Project"));

        let err = ClientError::codec(CodecError::out_of_range("70000", "Int16"));
        assert!(err.to_string().contains("70000"));
        assert!(err.to_string().contains("Int16"));
    }
}
