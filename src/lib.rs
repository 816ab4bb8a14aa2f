//! ftk Remote Installation Validator Library
//!
//! Checks, over SSH, that a remote host has Homebrew, that ftk installs
//! through it, and that the installed binary answers basic commands.

pub mod cli;
pub mod config;
pub mod error;
pub mod preflight;
pub mod process_guard;
pub mod report;
pub mod transport;
pub mod types;
pub mod validator;

// Re-export main types for convenience
pub use config::{SmokeTest, ValidatorConfig, WorkflowOptions};
pub use error::ValidatorError;
pub use process_guard::{ChildRegistry, INTERRUPTED_EXIT_CODE};
pub use report::{ConsoleReporter, Reporter, SilentReporter};
pub use transport::{CommandOutput, SshTransport, Transport};
pub use types::{Capture, Check, HostKeyPolicy, InstallVariant};
pub use validator::{Discovery, PackageManager, RemoteValidator, RunOutcome, ToolInstall};
