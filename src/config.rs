//! Validator configuration.
//!
//! Every constant the workflow depends on (ssh options, Homebrew locations,
//! the formula under test, smoke tests) lives here so it can be overridden
//! from a JSON file or replaced wholesale in tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ValidatorError;
use crate::types::{HostKeyPolicy, InstallVariant};

/// Hostname used when none is given on the command line
pub const DEFAULT_HOSTNAME: &str = "cedrics-mac-mini.local";

/// Official Homebrew bootstrap command
pub const HOMEBREW_INSTALL_COMMAND: &str = "/bin/bash -c \"$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)\"";

/// SSH session options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Local ssh client binary
    pub program: String,
    pub host_key_policy: HostKeyPolicy,
    pub connect_timeout_secs: u32,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            host_key_policy: HostKeyPolicy::AcceptNew,
            connect_timeout_secs: 10,
        }
    }
}

/// Where and how to find the package manager on the remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageManagerConfig {
    /// Command name looked up on the remote PATH
    pub name: String,
    /// Absolute install locations probed when PATH lookup fails, in order
    pub search_paths: Vec<String>,
    /// Directories prepended to the remote PATH for every command
    pub path_prefix: Vec<String>,
    pub install_command: String,
}

impl Default for PackageManagerConfig {
    fn default() -> Self {
        Self {
            name: "brew".to_string(),
            search_paths: vec![
                "/opt/homebrew/bin/brew".to_string(), // Apple Silicon
                "/usr/local/bin/brew".to_string(),    // Intel
            ],
            path_prefix: vec!["/opt/homebrew/bin".to_string(), "/usr/local/bin".to_string()],
            install_command: HOMEBREW_INSTALL_COMMAND.to_string(),
        }
    }
}

/// One smoke-test invocation of the installed tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeTest {
    pub command: String,
    pub description: String,
    /// Echo the command's trimmed stdout on success
    #[serde(default)]
    pub show_output: bool,
}

impl SmokeTest {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
            show_output: false,
        }
    }

    pub fn with_output(mut self) -> Self {
        self.show_output = true;
        self
    }
}

/// The tool whose installation is being validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Binary name on the remote PATH
    pub binary: String,
    /// External Homebrew source holding the formula
    pub tap: String,
    pub formula: String,
    pub smoke_tests: Vec<SmokeTest>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: "ftk".to_string(),
            tap: "spantree/fluent".to_string(),
            formula: "fluent-toolkit".to_string(),
            smoke_tests: vec![
                SmokeTest::new("ftk --version", "Version check").with_output(),
                SmokeTest::new("ftk --help", "Help command"),
            ],
        }
    }
}

impl ToolConfig {
    /// `<pm> tap <tap>`
    pub fn tap_command(&self, package_manager: &str) -> String {
        format!("{} tap {}", package_manager, self.tap)
    }

    /// `<pm> install <formula> [--HEAD]`
    pub fn install_command(&self, package_manager: &str, variant: InstallVariant) -> String {
        match variant.install_flag() {
            Some(flag) => format!("{} install {} {}", package_manager, self.formula, flag),
            None => format!("{} install {}", package_manager, self.formula),
        }
    }

    /// Commands that undo `tap_command` and `install_command`, in order
    pub fn cleanup_commands(&self, package_manager: &str) -> [String; 2] {
        [
            format!("{} uninstall {}", package_manager, self.formula),
            format!("{} untap {}", package_manager, self.tap),
        ]
    }
}

/// Complete validator configuration, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub ssh: SshConfig,
    pub package_manager: PackageManagerConfig,
    pub tool: ToolConfig,
}

impl ValidatorConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.ssh.program.trim().is_empty() {
            return Err(ValidatorError::config("ssh program must be specified"));
        }
        if self.ssh.connect_timeout_secs == 0 {
            return Err(ValidatorError::config("connect timeout must be at least 1 second"));
        }

        let pm = &self.package_manager;
        if pm.name.trim().is_empty() {
            return Err(ValidatorError::config("package manager name must be specified"));
        }
        if pm.search_paths.is_empty() {
            return Err(ValidatorError::config(
                "at least one package manager search path is required",
            ));
        }
        if let Some(path) = pm.search_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ValidatorError::config(format!(
                "package manager search path must be absolute: {}",
                path
            )));
        }
        if let Some(dir) = pm.path_prefix.iter().find(|d| !d.starts_with('/') || d.contains(':')) {
            return Err(ValidatorError::config(format!(
                "PATH prefix entries must be absolute and contain no ':': {}",
                dir
            )));
        }
        if pm.install_command.trim().is_empty() {
            return Err(ValidatorError::config("package manager install command must be specified"));
        }

        let tool = &self.tool;
        if tool.binary.trim().is_empty() {
            return Err(ValidatorError::config("tool binary must be specified"));
        }
        if tool.tap.trim().is_empty() {
            return Err(ValidatorError::config("tool tap must be specified"));
        }
        if tool.formula.trim().is_empty() {
            return Err(ValidatorError::config("tool formula must be specified"));
        }
        if let Some(test) = tool.smoke_tests.iter().find(|t| t.command.trim().is_empty()) {
            return Err(ValidatorError::config(format!(
                "smoke test '{}' has an empty command",
                test.description
            )));
        }

        Ok(())
    }
}

/// Run toggles, set from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
    pub install_package_manager: bool,
    pub install_tool: bool,
    pub variant: InstallVariant,
    pub cleanup: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            install_package_manager: true,
            install_tool: true,
            variant: InstallVariant::Stable,
            cleanup: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = ValidatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ssh.connect_timeout_secs, 10);
        assert_eq!(config.ssh.host_key_policy, HostKeyPolicy::AcceptNew);
        assert_eq!(
            config.package_manager.search_paths,
            vec!["/opt/homebrew/bin/brew", "/usr/local/bin/brew"]
        );
    }

    #[test]
    fn test_default_smoke_tests() {
        let tests = ValidatorConfig::default().tool.smoke_tests;
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].command, "ftk --version");
        assert!(tests[0].show_output);
        assert_eq!(tests[1].description, "Help command");
        assert!(!tests[1].show_output);
    }

    #[test]
    fn test_tool_commands() {
        let tool = ToolConfig::default();
        assert_eq!(tool.tap_command("brew"), "brew tap spantree/fluent");
        assert_eq!(
            tool.install_command("brew", InstallVariant::Stable),
            "brew install fluent-toolkit"
        );
        assert_eq!(
            tool.install_command("brew", InstallVariant::Head),
            "brew install fluent-toolkit --HEAD"
        );
        assert_eq!(
            tool.cleanup_commands("brew"),
            [
                "brew uninstall fluent-toolkit".to_string(),
                "brew untap spantree/fluent".to_string()
            ]
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let mut config = ValidatorConfig::default();
        config.ssh.connect_timeout_secs = 3;
        config.tool.smoke_tests.push(SmokeTest::new("ftk doctor", "Doctor"));

        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        let loaded = ValidatorConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"{ "ssh": { "connect_timeout_secs": 5 }, "tool": { "binary": "ftk2" } }"#)
            .unwrap();
        temp_file.flush().unwrap();

        let loaded = ValidatorConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.ssh.connect_timeout_secs, 5);
        assert_eq!(loaded.ssh.program, "ssh");
        assert_eq!(loaded.tool.binary, "ftk2");
        assert_eq!(loaded.tool.formula, "fluent-toolkit");
        assert_eq!(loaded.package_manager, PackageManagerConfig::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ValidatorConfig::load_from_file("/nonexistent/path/validator.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"{ invalid json }").unwrap();
        temp_file.flush().unwrap();

        assert!(ValidatorConfig::load_from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_validation_rejects_relative_search_path() {
        let mut config = ValidatorConfig::default();
        config.package_manager.search_paths = vec!["bin/brew".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bin/brew"));
    }

    #[test]
    fn test_validation_rejects_empty_search_paths() {
        let mut config = ValidatorConfig::default();
        config.package_manager.search_paths.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_path_prefix() {
        let mut config = ValidatorConfig::default();
        config.package_manager.path_prefix = vec!["/opt/a:/opt/b".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = ValidatorConfig::default();
        config.ssh.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_smoke_command() {
        let mut config = ValidatorConfig::default();
        config.tool.smoke_tests.push(SmokeTest::new("  ", "Blank"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Blank"));
    }

    #[test]
    fn test_validation_rejects_empty_formula() {
        let mut config = ValidatorConfig::default();
        config.tool.formula = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_workflow_options_default() {
        let options = WorkflowOptions::default();
        assert!(options.install_package_manager);
        assert!(options.install_tool);
        assert!(!options.cleanup);
        assert_eq!(options.variant, InstallVariant::Stable);
    }
}
