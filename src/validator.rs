//! Remote installation validator.
//!
//! Drives one validation run against one host:
//!
//! ```text
//! connectivity → package manager (discover, else install) → tool (discover,
//! else install) → smoke tests → optional cleanup
//! ```
//!
//! Each stage is a gate; the first failure ends the run. Every remote step
//! goes through [`RemoteValidator::run`], which is the only place that
//! talks to the [`Transport`].

use crate::config::{ValidatorConfig, WorkflowOptions};
use crate::error::{Result, ValidatorError};
use crate::report::Reporter;
use crate::transport::{remote_script, CommandOutput, Transport};
use crate::types::{Capture, Check, InstallVariant};
use tracing::{debug, info, warn};

/// Outcome of a lookup where absence is expected
#[derive(Debug)]
pub enum Discovery<T> {
    Found(T),
    NotFound,
    /// The lookup itself failed, so presence is unknown
    Error(ValidatorError),
}

impl<T> Discovery<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Discovery::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Discovery::NotFound)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Discovery::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// A package manager located on the remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManager {
    pub path: String,
    /// First line of `--version`
    pub version: String,
}

/// The target tool as found on the remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInstall {
    pub path: String,
    pub version: String,
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == RunOutcome::Success
    }
}

impl From<bool> for RunOutcome {
    fn from(passed: bool) -> Self {
        if passed { RunOutcome::Success } else { RunOutcome::Failure }
    }
}

/// Validates installation of the configured tool on one remote host
pub struct RemoteValidator<T: Transport, R: Reporter> {
    host: String,
    config: ValidatorConfig,
    transport: T,
    reporter: R,
    /// Set once discovery or installation locates the package manager
    package_manager_path: Option<String>,
    /// Directory of a discovered package manager that `path_prefix` lacks
    discovered_dir: Option<String>,
}

impl<T: Transport, R: Reporter> RemoteValidator<T, R> {
    pub fn new(host: impl Into<String>, config: ValidatorConfig, transport: T, reporter: R) -> Self {
        Self {
            host: host.into(),
            config,
            transport,
            reporter,
            package_manager_path: None,
            discovered_dir: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn package_manager_path(&self) -> Option<&str> {
        self.package_manager_path.as_deref()
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Run `command` on the remote host with the PATH adjustment applied.
    pub fn run(&mut self, command: &str, check: Check, capture: Capture) -> Result<CommandOutput> {
        self.reporter.command(&self.host, command);
        debug!(host = %self.host, command, ?check, ?capture, "running remote command");

        let script = remote_script(&self.path_prefix(), command);
        let output = self.transport.execute(&self.host, &script, capture)?;

        match check {
            Check::Required => output.ensure_success(),
            Check::Ignore => Ok(output),
        }
    }

    /// Hard gate: can we run anything at all on the host?
    pub fn check_connectivity(&mut self) -> bool {
        let title = format!("Testing SSH connection to {}...", self.host);
        self.reporter.section(&title);

        match self.run("hostname", Check::Required, Capture::Captured) {
            Ok(output) => {
                let remote_hostname = output.stdout.trim().to_string();
                info!(host = %self.host, remote_hostname, "connected");
                self.reporter.success(&format!("Connected to {}", remote_hostname));
                true
            }
            Err(e) if e.is_interrupted() => false,
            Err(e) => {
                warn!(host = %self.host, error = %e, "connectivity check failed");
                self.reporter.failure(&format!("Connection failed: {}", e));
                false
            }
        }
    }

    /// Locate the package manager: PATH lookup first, then well-known paths.
    pub fn discover_package_manager(&mut self) -> Discovery<PackageManager> {
        self.reporter.section("Checking Homebrew installation...");

        let found = match self.lookup_package_manager() {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "package manager discovery failed");
                self.reporter.failure(&format!("Homebrew check failed: {}", e));
                return Discovery::Error(e);
            }
        };

        match found {
            Some(pm) => {
                self.record_package_manager(&pm.path);
                self.reporter
                    .success(&format!("Homebrew installed at {}", pm.path));
                self.reporter.detail(&pm.version);
                Discovery::Found(pm)
            }
            None => {
                self.reporter
                    .warning("Homebrew not found in PATH or common locations");
                Discovery::NotFound
            }
        }
    }

    /// Directories exported ahead of the session PATH for every command
    fn path_prefix(&self) -> Vec<String> {
        let mut dirs = self.config.package_manager.path_prefix.clone();
        dirs.extend(self.discovered_dir.iter().cloned());
        dirs
    }

    fn record_package_manager(&mut self, path: &str) {
        self.package_manager_path = Some(path.to_string());
        self.discovered_dir = parent_dir(path)
            .filter(|dir| !dir.contains(':'))
            .filter(|dir| !self.config.package_manager.path_prefix.iter().any(|d| d == dir))
            .map(str::to_string);
        if let Some(dir) = &self.discovered_dir {
            info!(dir = %dir, "adding package manager directory to remote PATH");
        }
    }

    fn lookup_package_manager(&mut self) -> Result<Option<PackageManager>> {
        let name = self.config.package_manager.name.clone();

        let which = self.run(&format!("which {}", name), Check::Ignore, Capture::Captured)?;
        if which.success() {
            let path = which.stdout.trim().to_string();
            let version = self.run(&format!("{} --version", name), Check::Required, Capture::Captured)?;
            return Ok(Some(PackageManager {
                path,
                version: version.first_line().to_string(),
            }));
        }
        reject_transport_failure(&which)?;
        debug!(name, "not on PATH, probing well-known locations");

        for path in self.config.package_manager.search_paths.clone() {
            let probe = self.run(
                &format!("test -x {} && echo found", path),
                Check::Ignore,
                Capture::Captured,
            )?;
            reject_transport_failure(&probe)?;
            if !(probe.success() && probe.stdout.contains("found")) {
                continue;
            }

            let version = self.run(&format!("{} --version", path), Check::Ignore, Capture::Captured)?;
            reject_transport_failure(&version)?;
            if version.success() {
                return Ok(Some(PackageManager {
                    path,
                    version: version.first_line().to_string(),
                }));
            }
            debug!(path, exit_code = version.exit_code, "present but version query failed");
        }

        Ok(None)
    }

    /// Bootstrap the package manager with its official installer.
    ///
    /// Output is streamed because the installer may prompt on the remote side.
    pub fn install_package_manager(&mut self) -> Result<()> {
        self.reporter.section("Installing Homebrew...");
        self.reporter
            .note("This requires user interaction on the remote host");

        let install = self.config.package_manager.install_command.clone();
        self.run(&install, Check::Required, Capture::Streamed)?;

        // The installer does not report where it put the binary
        let name = self.config.package_manager.name.clone();
        self.record_package_manager(&name);
        self.reporter.success("Homebrew installation completed");
        Ok(())
    }

    /// Locate the target tool.
    ///
    /// A tool that resolves on PATH but cannot report its version is an
    /// error, not an absence.
    pub fn discover_tool(&mut self) -> Discovery<ToolInstall> {
        let binary = self.config.tool.binary.clone();
        self.reporter
            .section(&format!("Checking {} installation...", binary));

        let which = match self.run(&format!("which {}", binary), Check::Ignore, Capture::Captured) {
            Ok(output) => output,
            Err(e) => return self.tool_lookup_failed(e),
        };

        if !which.success() {
            if let Err(e) = reject_transport_failure(&which) {
                return self.tool_lookup_failed(e);
            }
            self.reporter.warning(&format!("{} not found", binary));
            return Discovery::NotFound;
        }

        let path = which.stdout.trim().to_string();
        match self.run(&format!("{} --version", binary), Check::Required, Capture::Captured) {
            Ok(output) => {
                let version = output.stdout.trim().to_string();
                self.reporter
                    .success(&format!("{} installed at {}", binary, path));
                self.reporter.detail(&format!("Version: {}", version));
                Discovery::Found(ToolInstall { path, version })
            }
            Err(e) => self.tool_lookup_failed(e),
        }
    }

    fn tool_lookup_failed(&mut self, e: ValidatorError) -> Discovery<ToolInstall> {
        warn!(error = %e, "tool discovery failed");
        self.reporter
            .failure(&format!("{} check failed: {}", self.config.tool.binary, e));
        Discovery::Error(e)
    }

    /// Register the tap, then install the formula. Both steps must succeed.
    pub fn install_tool(&mut self, variant: InstallVariant) -> Result<()> {
        let tool = self.config.tool.clone();
        let pm = self.package_manager_command();
        self.reporter
            .section(&format!("Installing {} ({})...", tool.binary, variant));

        if let Err(e) = self.run(&tool.tap_command(&pm), Check::Required, Capture::Captured) {
            self.reporter
                .failure(&format!("Failed to tap repository: {}", e));
            return Err(e);
        }
        self.reporter.success(&format!("Tapped {}", tool.tap));

        if let Err(e) = self.run(&tool.install_command(&pm, variant), Check::Required, Capture::Captured) {
            self.reporter
                .failure(&format!("{} installation failed: {}", tool.binary, e));
            return Err(e);
        }
        self.reporter
            .success(&format!("{} installed successfully", tool.binary));
        Ok(())
    }

    /// Run every configured smoke test once; true only if all pass.
    pub fn run_smoke_tests(&mut self) -> Result<bool> {
        let tests = self.config.tool.smoke_tests.clone();
        self.reporter
            .section(&format!("Testing {} commands...", self.config.tool.binary));

        let mut all_passed = true;
        for test in &tests {
            match self.run(&test.command, Check::Required, Capture::Captured) {
                Ok(output) => {
                    self.reporter.success(&test.description);
                    if test.show_output {
                        self.reporter.detail(output.stdout.trim());
                    }
                }
                Err(e) if e.is_command_failure() => {
                    warn!(command = %test.command, error = %e, "smoke test failed");
                    self.reporter
                        .failure(&format!("{} failed: {}", test.description, e));
                    all_passed = false;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(all_passed)
    }

    /// Best-effort uninstall and untap.
    pub fn cleanup(&mut self) -> bool {
        self.reporter.section(&format!(
            "Cleaning up {} installation...",
            self.config.tool.binary
        ));

        let pm = self.package_manager_command();
        for command in self.config.tool.cleanup_commands(&pm) {
            if let Err(e) = self.run(&command, Check::Required, Capture::Captured) {
                warn!(error = %e, "cleanup failed");
                self.reporter.warning(&format!("Cleanup failed: {}", e));
                return false;
            }
        }

        self.reporter.success(&format!(
            "{} uninstalled successfully",
            self.config.tool.binary
        ));
        true
    }

    /// Package manager invocation for follow-up commands.
    ///
    /// Uses the bare name, which resolves through the PATH adjustment. That
    /// adjustment includes the directory discovery found it in.
    fn package_manager_command(&self) -> String {
        self.config.package_manager.name.clone()
    }

    /// Run the full workflow.
    ///
    /// `Ok` carries the verdict; `Err` is reserved for unexpected errors
    /// (the local ssh client could not be run, and so on).
    pub fn validate(&mut self, options: &WorkflowOptions) -> Result<RunOutcome> {
        let title = format!("{} Remote Installation Validator", self.config.tool.binary);
        let host = self.host.clone();
        self.reporter.banner(&title, &host);
        info!(host = %self.host, ?options, "starting validation");

        if !self.check_connectivity() {
            return Ok(RunOutcome::Failure);
        }

        match self.discover_package_manager() {
            Discovery::Found(_) => {}
            Discovery::Error(e) => return fail_unless_command(e),
            Discovery::NotFound if options.install_package_manager => {
                if let Err(e) = self.install_package_manager() {
                    self.reporter
                        .failure(&format!("Homebrew installation failed: {}", e));
                    return fail_unless_command(e);
                }
            }
            Discovery::NotFound => {
                self.reporter
                    .failure("Homebrew required but installation not enabled");
                return Ok(RunOutcome::Failure);
            }
        }

        match self.discover_tool() {
            Discovery::Found(_) => {}
            Discovery::Error(e) => return fail_unless_command(e),
            Discovery::NotFound if options.install_tool => {
                if let Err(e) = self.install_tool(options.variant) {
                    return fail_unless_command(e);
                }
            }
            Discovery::NotFound => {
                let binary = self.config.tool.binary.clone();
                self.reporter
                    .failure(&format!("{} required but installation not enabled", binary));
                return Ok(RunOutcome::Failure);
            }
        }

        if !self.run_smoke_tests()? {
            return Ok(RunOutcome::Failure);
        }

        if options.cleanup {
            self.cleanup();
        }

        info!(host = %self.host, "validation passed");
        self.reporter.finished("Validation completed successfully!");
        Ok(RunOutcome::Success)
    }
}

/// Directory part of an absolute remote path
fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|dir| dir.starts_with('/'))
}

/// Exit 255 from ssh means the session failed, not the lookup
fn reject_transport_failure(output: &CommandOutput) -> Result<()> {
    if output.is_transport_failure() {
        return Err(ValidatorError::command_failure(
            output.exit_code,
            output.stdout.clone(),
            output.stderr.clone(),
        ));
    }
    Ok(())
}

/// Remote command failures are a failed run; anything else propagates
fn fail_unless_command(e: ValidatorError) -> Result<RunOutcome> {
    if e.is_command_failure() {
        Ok(RunOutcome::Failure)
    } else {
        Err(e)
    }
}
