//! Pre-flight checks for the local environment
//!
//! Verifies the ssh client can be found before any remote work starts, so
//! a missing client is reported as such rather than as an unreachable host.

use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{Result, ValidatorError};

/// Check if a binary is available in PATH, or exists if given as a path
pub fn binary_exists(name: &str) -> bool {
    if name.contains('/') {
        return Path::new(name).is_file();
    }

    Command::new("which")
        .arg(name)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Fail with an actionable message when the ssh client is missing
pub fn verify_ssh_client(program: &str) -> Result<()> {
    debug!(program, "running pre-flight checks");

    if binary_exists(program) {
        debug!(program, "ssh client found");
        return Ok(());
    }

    Err(ValidatorError::unexpected(format!(
        "ssh client '{}' not found. Install OpenSSH or set \"ssh.program\" in the config file",
        program
    )))
}
