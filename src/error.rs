//! Error handling module for the remote validator
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Remote command failures carry the exit code and both output streams so the
//! caller can report exactly what the remote host said.

use thiserror::Error;

/// Main error type for the remote validator
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// A remote command that was required to succeed exited non-zero
    #[error("Command failed with exit code {exit_code}\nstdout: {stdout}\nstderr: {stderr}")]
    CommandFailure {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Anything else: session setup failure, process wait failure, broken invariants
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// IO errors (config files, spawning the ssh client)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A termination signal arrived; no further remote command is started
    #[error("Interrupted by signal {0}")]
    Interrupted(i32),
}

/// Result type alias for validator operations
pub type Result<T> = std::result::Result<T, ValidatorError>;

impl ValidatorError {
    /// Create a command failure from a finished remote command
    pub fn command_failure(
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailure {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an unexpected error
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the error came from a remote command exiting non-zero
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailure { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// Exit code of the failed remote command, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailure { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
