//! Remote command transport.
//!
//! `Transport` is the single primitive the validator is built on: run one
//! shell command on a host and hand back its exit code and output.
//! `SshTransport` does this with the system `ssh` client; tests swap in a
//! scripted fake.
//!
//! # Invocation shape
//!
//! ```text
//! ssh -o StrictHostKeyChecking=accept-new -o ConnectTimeout=10 <host> "export PATH=<a>:<b>:$PATH; <command>"
//! ```

use crate::config::SshConfig;
use crate::error::{Result, ValidatorError};
use crate::process_guard::{self, ChildRegistry, CommandLifecycle};
use crate::types::Capture;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Exit status `ssh` itself uses for connection and authentication errors
pub const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Output from one remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 if the client was killed by a signal)
    pub exit_code: i32,
    /// Empty in streamed mode
    pub stdout: String,
    /// Empty in streamed mode
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// True when the session itself failed rather than the remote command
    ///
    /// A remote command exiting 255 on its own is indistinguishable.
    pub fn is_transport_failure(&self) -> bool {
        self.exit_code == SSH_TRANSPORT_FAILURE
    }

    /// Convert a non-zero exit into `ValidatorError::CommandFailure`
    pub fn ensure_success(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ValidatorError::command_failure(
                self.exit_code,
                self.stdout,
                self.stderr,
            ))
        }
    }

    /// First line of trimmed stdout
    pub fn first_line(&self) -> &str {
        self.stdout.trim().lines().next().unwrap_or("")
    }
}

/// Runs a complete shell script on a remote host
pub trait Transport {
    /// Execute `script` on `host`.
    ///
    /// A non-zero remote exit is returned as `Ok`; only failing to run the
    /// local client at all, or an interrupt, is an error.
    fn execute(&self, host: &str, script: &str, capture: Capture) -> Result<CommandOutput>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, host: &str, script: &str, capture: Capture) -> Result<CommandOutput> {
        (**self).execute(host, script, capture)
    }
}

/// Prefix `command` with an export that puts `path_prefix` ahead of the
/// session's own PATH.
pub fn remote_script(path_prefix: &[String], command: &str) -> String {
    if path_prefix.is_empty() {
        return command.to_string();
    }
    format!("export PATH={}:$PATH; {}", path_prefix.join(":"), command)
}

/// Transport backed by the system `ssh` client
#[derive(Debug, Clone, Default)]
pub struct SshTransport {
    config: SshConfig,
}

impl SshTransport {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Options placed before the host on every invocation
    pub fn session_options(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            format!(
                "StrictHostKeyChecking={}",
                self.config.host_key_policy.as_ssh_value()
            ),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout_secs),
        ]
    }

    /// Build the local `ssh` invocation for `script` on `host`
    pub fn build_command(&self, host: &str, script: &str, capture: Capture) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.session_options()).arg(host).arg(script);

        match capture {
            Capture::Captured => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            Capture::Streamed => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        cmd.die_with_parent();
        cmd
    }
}

impl Transport for SshTransport {
    fn execute(&self, host: &str, script: &str, capture: Capture) -> Result<CommandOutput> {
        if let Some(sig) = process_guard::received_signal() {
            return Err(ValidatorError::Interrupted(sig));
        }

        let mut cmd = self.build_command(host, script, capture);
        debug!(host, ?capture, "spawning {}", self.config.program);

        let mut child = cmd.spawn().map_err(|e| {
            ValidatorError::unexpected(format!("Failed to spawn {}: {}", self.config.program, e))
        })?;
        let pid = child.id();

        {
            let registry = ChildRegistry::global();
            if let Ok(mut guard) = registry.lock() {
                guard.register(pid);
            }
        }

        // Signal arrived between the check above and registration
        if process_guard::received_signal().is_some() {
            let _ = child.kill();
        }

        let output = child.wait_with_output();

        {
            let registry = ChildRegistry::global();
            if let Ok(mut guard) = registry.lock() {
                guard.unregister(pid);
            }
        }

        if let Some(sig) = process_guard::received_signal() {
            return Err(ValidatorError::Interrupted(sig));
        }

        let output = output?;
        let exit_code = output.status.code().unwrap_or(-1);
        info!(host, exit_code, "remote command finished");

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
