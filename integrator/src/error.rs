//! Error types for the repository integrator.
//!
//! This module defines semantic error variants that tell the operator what
//! went wrong and, where possible, how to recover. Every fatal failure in the
//! integration pipeline is one of these variants; backup problems are not
//! errors and are reported as warnings instead (see [`crate::backup`]).

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while integrating the secondary repository.
#[derive(Debug, Error)]
pub enum IntegratorError {
    /// The process is not running with superuser privileges.
    #[error("this tool must be run as root (effective UID is {euid}); re-run it with sudo")]
    PrivilegeRequired {
        /// The effective UID the process is running under.
        euid: u32,
    },

    /// The signing key could not be fetched.
    #[error("failed to download signing key from {url}: {reason}")]
    KeyDownload {
        /// The key URL that was requested.
        url: String,
        /// Description of the transport, TLS, or HTTP failure.
        reason: String,
    },

    /// The key server answered with HTTP 404.
    #[error("signing key not found at {url}")]
    KeyNotFound {
        /// The key URL that returned 404.
        url: String,
    },

    /// An external command exited unsuccessfully.
    #[error("{program} exited with {}: {stderr}", describe_status(.status))]
    CommandFailed {
        /// The program that failed (for example `apt-get`).
        program: String,
        /// The exit status, if the process was not killed by a signal.
        status: Option<i32>,
        /// Trimmed standard error captured from the command.
        stderr: String,
    },

    /// A managed configuration file could not be written.
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        /// Path of the file that could not be written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be read or parsed.
    #[error("could not load configuration from {path}: {reason}")]
    ConfigLoad {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the read or parse failure.
        reason: String,
    },

    /// The configuration was loaded but holds unusable values.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which value is invalid and why.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl IntegratorError {
    /// Returns the process exit code that reports this error.
    ///
    /// Command failures propagate the child's own exit status; everything
    /// else, including the privilege check, exits with `1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_integrator::error::IntegratorError;
    ///
    /// let err = IntegratorError::CommandFailed {
    ///     program: "apt-get".to_owned(),
    ///     status: Some(100),
    ///     stderr: String::new(),
    /// };
    /// assert_eq!(err.exit_code(), 100);
    /// assert_eq!(IntegratorError::PrivilegeRequired { euid: 1000 }.exit_code(), 1);
    /// ```
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed {
                status: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no exit status (terminated by signal)".to_owned(),
    }
}

/// Result type alias using [`IntegratorError`].
pub type Result<T> = std::result::Result<T, IntegratorError>;
