//! # Bridge Error Types
//!
//! Every error a host command can produce. The six kinds map one-to-one onto
//! the stable wire codes the host sees in its error replies.

use crate::value::Value;
use thiserror::Error;

/// Coarse classification of a [`BridgeError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Argument shape or type mismatch, caught before any native call.
    InvalidArguments,
    /// Operation not legal in the current lifecycle state.
    InvalidState,
    /// Operation needs a live renderer that does not exist.
    NotInitialized,
    /// Asset resolution failed.
    ResourceNotFound,
    /// The native engine reported a failure status.
    NativeCallFailed,
    /// Unknown command name.
    NotImplemented,
}

impl ErrorKind {
    /// Stable error code sent to the host.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidArguments => "INVALID_ARGUMENTS",
            Self::InvalidState => "INVALID_STATE",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::NativeCallFailed => "NATIVE_CALL_FAILED",
            Self::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors that can occur while handling a host command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Arguments did not match the command's expected shape.
    #[error("invalid arguments for {command}: {reason}")]
    InvalidArguments {
        /// Command being dispatched.
        command: String,
        /// What was wrong, including the expected shape.
        reason: String,
    },

    /// Operation is not legal in the current lifecycle state.
    #[error("invalid state for {operation}: {reason}")]
    InvalidState {
        /// Operation that was refused.
        operation: &'static str,
        /// Why it was refused.
        reason: String,
    },

    /// No live renderer exists.
    #[error("{0} requires a live renderer")]
    NotInitialized(&'static str),

    /// Asset could not be resolved.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Native engine returned a failure status.
    #[error("native call {call} failed with status {status:?}")]
    NativeCallFailed {
        /// Native entry point that failed.
        call: String,
        /// Raw status returned by the engine.
        status: Value,
    },

    /// Unknown command name.
    #[error("command not implemented: {0}")]
    NotImplemented(String),
}

impl BridgeError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::NotInitialized(_) => ErrorKind::NotInitialized,
            Self::ResourceNotFound(_) => ErrorKind::ResourceNotFound,
            Self::NativeCallFailed { .. } => ErrorKind::NativeCallFailed,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }

    /// Stable error code sent to the host.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Shorthand for an [`BridgeError::InvalidState`].
    pub fn invalid_state(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`BridgeError::NativeCallFailed`].
    pub fn native(call: impl Into<String>, status: Value) -> Self {
        Self::NativeCallFailed {
            call: call.into(),
            status,
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidArguments.code(), "INVALID_ARGUMENTS");
        assert_eq!(ErrorKind::NotImplemented.to_string(), "NOT_IMPLEMENTED");

        let err = BridgeError::invalid_state("resize", "no swapchain");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn test_native_failure_keeps_status() {
        let err = BridgeError::native("set_camera", Value::Bool(false));
        match &err {
            BridgeError::NativeCallFailed { call, status } => {
                assert_eq!(call, "set_camera");
                assert_eq!(status, &Value::Bool(false));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("set_camera"));
    }
}
