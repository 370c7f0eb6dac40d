//! # Error Handling
//!
//! One error type for the whole client. Every fallible library operation
//! returns [`ScanResult`]; the binary wraps these in `anyhow` at the edge.
//!
//! ## Classification
//!
//! - [`ScanError::category`] gives a stable short label for logs
//! - [`ScanError::is_transient`] marks faults that may clear on a later
//!   attempt (network, timeout, session bootstrap). Nothing retries
//!   automatically; the label only drives log severity and CLI exit hints.
//!
//! User-visible text never comes from `Display` on this type. The upload
//! pipeline maps failures onto the fixed messages in [`crate::messages`].
//!
//! ## Usage
//!
//! ```rust
//! use srscan::error::ScanError;
//!
//! let error = ScanError::state("Sending", "start upload", "an upload is already in flight");
//! assert_eq!(error.category(), "state");
//! assert!(!error.is_transient());
//! ```

use srscan_scale::ScaleError;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias using our custom error type
pub type ScanResult<T> = Result<T, ScanError>;

/// Base error type for the scan client
#[derive(Debug, Error)]
pub enum ScanError {
    /// Configuration validation errors
    #[error("Configuration error in '{field}': {reason} (value: {value})")]
    Config {
        field: String,
        value: String,
        reason: String,
    },
    /// Camera could not be acquired (denied, absent, busy)
    #[error("Camera unavailable: {reason}")]
    Camera { reason: String },
    /// Snapshot or master encode of a frame failed
    #[error("Frame capture failed: {reason}")]
    FrameCapture { reason: String },
    /// Downscale pipeline errors
    #[error("Processing failed during {operation}: {source}")]
    Processing {
        operation: String,
        #[source]
        source: ScaleError,
    },
    /// A blocking worker panicked or was cancelled
    #[error("Background task for {operation} failed: {source}")]
    Task {
        operation: String,
        #[source]
        source: tokio::task::JoinError,
    },
    /// Session bootstrap failures
    #[error("Session error: {reason}")]
    Session { reason: String },
    /// Durable client-local storage failures
    #[error("Storage error during {operation}: {reason}")]
    Storage { operation: String, reason: String },
    /// Remote service errors
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Timeout errors
    #[error("Timeout during {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },
    /// State errors (invalid state transitions)
    #[error("Invalid state transition from '{current_state}' when attempting '{attempted_operation}': {reason}")]
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
    },
    /// I/O errors
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Create a configuration error
    pub fn config(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a camera acquisition error
    pub fn camera(reason: impl Into<String>) -> Self {
        Self::Camera { reason: reason.into() }
    }

    /// Create a frame capture error
    pub fn frame_capture(reason: impl Into<String>) -> Self {
        Self::FrameCapture { reason: reason.into() }
    }

    /// Create a processing error
    pub fn processing(operation: impl Into<String>, source: ScaleError) -> Self {
        Self::Processing {
            operation: operation.into(),
            source,
        }
    }

    /// Create a background task error
    pub fn task(operation: impl Into<String>, source: tokio::task::JoinError) -> Self {
        Self::Task {
            operation: operation.into(),
            source,
        }
    }

    /// Create a session error
    pub fn session(reason: impl Into<String>) -> Self {
        Self::Session { reason: reason.into() }
    }

    /// Create a storage error
    pub fn storage(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Camera { .. } => "camera",
            Self::FrameCapture { .. } => "frame_capture",
            Self::Processing { .. } => "processing",
            Self::Task { .. } => "task",
            Self::Session { .. } => "session",
            Self::Storage { .. } => "storage",
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::State { .. } => "state",
            Self::Io { .. } => "io",
        }
    }

    /// Check if the error may resolve itself on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Session { .. } => true,
            Self::Transport(err) => err.status.is_none_or(|code| code >= 500),
            _ => false,
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ScanError::config("timeout_ms", "0", "must be greater than 0");
        assert_eq!(error.category(), "config");
        assert!(!error.is_transient());
        assert_eq!(
            error.to_string(),
            "Configuration error in 'timeout_ms': must be greater than 0 (value: 0)"
        );
    }

    #[test]
    fn test_transport_classification() {
        let unreachable = ScanError::from(TransportError::unreachable("connection refused"));
        assert_eq!(unreachable.category(), "transport");
        assert!(unreachable.is_transient());

        let bad_request = ScanError::from(TransportError::http(400, None));
        assert!(!bad_request.is_transient());

        let server_down = ScanError::from(TransportError::http(503, None));
        assert!(server_down.is_transient());
    }

    #[test]
    fn test_timeout_is_transient() {
        let error = ScanError::timeout("upload", 30_000);
        assert!(error.is_transient());
        assert_eq!(error.to_string(), "Timeout during upload after 30000ms");
    }
}
