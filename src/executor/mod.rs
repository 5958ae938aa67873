//! Command execution abstraction.
//!
//! Mounting, unmounting and FTP transfers are delegated to external tools.
//! They all go through [`CommandExecutor`] so the fetchers can be exercised
//! with a recording executor in tests.
//!
//! - [`CommandSpec`]: command line plus optional privilege escalation
//! - [`ExecutionResult`]: exit status of a finished command
//! - [`RealCommandExecutor`]: runs commands with `std::process::Command`

mod pipe;
mod real;

use std::process::ExitStatus;

use anyhow::Result;

use crate::privilege::PrivilegeMethod;

pub use real::RealCommandExecutor;

/// Specification for a command to be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The command to execute (e.g., "mount")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Privilege escalation method to wrap the command
    pub privilege: Option<PrivilegeMethod>,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            privilege: None,
        }
    }

    /// Sets the privilege escalation method
    #[must_use]
    pub fn with_privilege(mut self, privilege: Option<PrivilegeMethod>) -> Self {
        self.privilege = privilege;
        self
    }

    /// Renders the command line as it would be typed in a shell.
    ///
    /// Used in log lines and error messages only.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        if let Some(privilege) = self.privilege {
            parts.push(privilege.command_name().to_string());
        }
        parts.push(self.command.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Result of command execution
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit status of the command
    pub status: ExitStatus,
}

impl ExecutionResult {
    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Returns the exit code, or `None` if the process was killed by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` so one executor can be shared
/// through an `Arc<dyn CommandExecutor>` by every fetcher of a process.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    ///
    /// A non-zero exit is reported through [`ExecutionResult`], not as `Err`;
    /// `Err` means the command could not be run at all.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}
