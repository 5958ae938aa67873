//! Privilege escalation for mount operations.
//!
//! Loop and NFS mounts need root. When the tool itself runs unprivileged,
//! `mount`/`umount` can be wrapped with `sudo` or `doas` instead.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Privilege escalation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeMethod {
    /// Use `sudo` for privilege escalation.
    Sudo,
    /// Use `doas` for privilege escalation.
    Doas,
}

impl PrivilegeMethod {
    /// Returns the command name for this privilege method.
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::Sudo => "sudo",
            Self::Doas => "doas",
        }
    }
}

impl std::fmt::Display for PrivilegeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command_name())
    }
}

/// Returns true if the current process runs with effective uid 0.
pub fn running_as_root() -> bool {
    rustix::process::geteuid().is_root()
}
