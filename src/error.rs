//! Error types for Routinely operations.
//!
//! This module defines [`RoutineError`], the primary error type used throughout
//! the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `RoutineError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `RoutineError::Other`) for unexpected errors
//! - All errors should provide actionable messages for users

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Routinely operations.
#[derive(Debug, Error)]
pub enum RoutineError {
    /// Another process holds a valid (non-stale) lock.
    #[error("Lock at {lock_dir} held by PID {pid} for {age_secs}s — concurrent run detected")]
    LockHeld {
        lock_dir: PathBuf,
        pid: u32,
        age_secs: u64,
    },

    /// I/O fault while creating or inspecting the lock entry.
    #[error("Failed to acquire lock at {lock_dir}: {message}")]
    LockAcquisitionFailed { lock_dir: PathBuf, message: String },

    /// Requested step identifier or alias is not registered.
    #[error("Unknown step '{token}' (run with --list-steps to see valid names)")]
    UnknownStep { token: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RoutineError {
    /// Process exit code this error maps to when it aborts the run.
    ///
    /// Per-step failures and timeouts are not errors; they flow through
    /// `StepResult` and the report computes their exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            RoutineError::UnknownStep { .. } => 2,
            RoutineError::LockHeld { .. } | RoutineError::LockAcquisitionFailed { .. } => 3,
            _ => 1,
        }
    }
}

/// Result type alias for Routinely operations.
pub type Result<T> = std::result::Result<T, RoutineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_held_displays_pid_and_age() {
        let err = RoutineError::LockHeld {
            lock_dir: PathBuf::from("/tmp/routinely.lock"),
            pid: 4321,
            age_secs: 17,
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/routinely.lock"));
        assert!(msg.contains("4321"));
        assert!(msg.contains("17"));
    }

    #[test]
    fn unknown_step_displays_token() {
        let err = RoutineError::UnknownStep {
            token: "frobnicate".into(),
        };
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn exit_codes_distinguish_error_classes() {
        let unknown = RoutineError::UnknownStep { token: "x".into() };
        assert_eq!(unknown.exit_code(), 2);

        let held = RoutineError::LockHeld {
            lock_dir: PathBuf::from("/tmp/l"),
            pid: 1,
            age_secs: 0,
        };
        assert_eq!(held.exit_code(), 3);

        let io: RoutineError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: RoutineError = io_err.into();
        assert!(matches!(err, RoutineError::Io(_)));
    }
}
