//! Type-safe option types for the validator
//!
//! Remote command behavior is selected with small enums instead of bare
//! booleans so call sites read as what they do.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Whether a non-zero remote exit code is an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Non-zero exit becomes `ValidatorError::CommandFailure`
    Required,
    /// Caller inspects the raw exit code
    Ignore,
}

/// Whether remote output is captured or passed through to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Captured,
    /// stdin/stdout/stderr are inherited; the installer may prompt
    Streamed,
}

/// SSH host-key verification policy
///
/// Only policies that never silently skip verification are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Trust on first use, reject changed keys
    #[default]
    #[strum(serialize = "accept-new")]
    AcceptNew,
    /// Only hosts already present in known_hosts
    #[strum(serialize = "strict")]
    Strict,
}

impl HostKeyPolicy {
    /// Value passed to `-o StrictHostKeyChecking=`
    pub fn as_ssh_value(self) -> &'static str {
        match self {
            Self::AcceptNew => "accept-new",
            Self::Strict => "yes",
        }
    }
}

/// Which variant of the target formula to install
///
/// Chosen on the command line only; `Display` labels the install section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum InstallVariant {
    #[default]
    Stable,
    /// Build from the formula's development HEAD
    #[strum(serialize = "HEAD")]
    Head,
}

impl InstallVariant {
    pub fn from_head_flag(use_head: bool) -> Self {
        if use_head { Self::Head } else { Self::Stable }
    }

    /// Extra argument appended to `brew install`
    pub fn install_flag(self) -> Option<&'static str> {
        match self {
            Self::Stable => None,
            Self::Head => Some("--HEAD"),
        }
    }
}
