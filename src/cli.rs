use clap::Parser;
use std::path::PathBuf;

use crate::config::{DEFAULT_HOSTNAME, ValidatorConfig, WorkflowOptions};
use crate::types::InstallVariant;

/// Validate ftk installation on a remote host
#[derive(Parser, Debug)]
#[command(name = "ftk-remote-validator")]
#[command(about = "Validate ftk installation on a remote host over SSH")]
#[command(version)]
pub struct Cli {
    /// Remote hostname
    #[arg(default_value = DEFAULT_HOSTNAME)]
    pub hostname: String,

    /// Skip Homebrew installation if not found
    #[arg(long)]
    pub no_install_homebrew: bool,

    /// Skip ftk installation if not found
    #[arg(long)]
    pub no_install_ftk: bool,

    /// Uninstall ftk after testing
    #[arg(long)]
    pub cleanup: bool,

    /// Install the development (HEAD) build instead of the stable release
    #[arg(long)]
    pub head: bool,

    /// JSON configuration file overriding the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SSH connect timeout in seconds (overrides the config file)
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u32>,

    /// Suppress progress output; only the exit status reports the result
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            install_package_manager: !self.no_install_homebrew,
            install_tool: !self.no_install_ftk,
            variant: InstallVariant::from_head_flag(self.head),
            cleanup: self.cleanup,
        }
    }

    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut ValidatorConfig) {
        if let Some(timeout) = self.connect_timeout {
            config.ssh.connect_timeout_secs = timeout;
        }
    }
}
