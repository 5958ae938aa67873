//! Domain-specific error types for distro-probe.
//!
//! This module defines `DistroError`, a `thiserror`-based enum covering
//! the failure classes of the acquisition pipeline. Library functions
//! return `Result<T, DistroError>` so callers can tell an unreachable
//! install source apart from a missing file or an unrecognised tree,
//! while the command-executor boundary and the CLI use `anyhow::Result`.
//!
//! `DistroError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at boundaries that return `anyhow::Result`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). Unrecognised kinds
/// fall back to the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Error type for location handling, probing and artifact acquisition.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DistroError {
    /// The install source is unreachable, malformed or cannot be mounted.
    #[error("invalid install location: {0}")]
    Location(String),

    /// A specific file is missing or unreadable at an otherwise valid location.
    #[error("failed to fetch {path}: {reason}")]
    Fetch {
        /// Path of the file relative to the install tree.
        path: String,
        /// Why the file could not be retrieved.
        reason: String,
    },

    /// No distribution signature matched the install tree.
    #[error("could not find an installable distribution at '{uri}'")]
    NoInstallableDistro {
        /// The base URI that was probed.
        uri: String,
    },

    /// A distribution matched but its boot artifacts could not be acquired.
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Releasing a fetcher resource (unmount, temp dir removal) failed.
    ///
    /// Only ever logged; never returned from a public entry point.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    /// A user-supplied value was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// A configuration file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An external command (mount, umount, curl) failed.
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command line that was executed.
        command: String,
        /// Exit status or reason for the failure.
        status: String,
    },

    /// The run was stopped by Ctrl-C before it finished.
    #[error("interrupted")]
    Interrupted,

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// Description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl DistroError {
    /// Creates an `Io` variant with the `message` derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates a `Fetch` variant for `path`.
    pub(crate) fn fetch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error only means "the file is not there".
    ///
    /// Signature probing treats such errors as a negative match.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Returns true if the run was stopped by Ctrl-C.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Returns true if the install source itself is unusable.
    pub fn is_location(&self) -> bool {
        matches!(self, Self::Location(_))
    }
}
