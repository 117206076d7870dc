//! External command execution.
//!
//! The key import and index refresh steps shell out to APT tooling. Routing
//! every invocation through [`CommandExecutor`] lets tests substitute a stub
//! that records the calls instead of touching the host.

use crate::error::{IntegratorError, Result};
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use repo_integrator::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("apt-get", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), repo_integrator::error::IntegratorError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// APT tools are run with `DEBIAN_FRONTEND=noninteractive` so they never
/// stop to prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        log::debug!("running {cmd} {}", args.join(" "));
        Command::new(cmd)
            .args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .output()
            .map_err(IntegratorError::from)
    }
}

/// Runs a command and turns an unsuccessful exit into an error.
///
/// # Errors
///
/// Returns the executor's error if the command cannot be spawned, or
/// [`IntegratorError::CommandFailed`] carrying the exit status and trimmed
/// standard error if it exits unsuccessfully.
pub fn run_checked(executor: &dyn CommandExecutor, program: &str, args: &[&str]) -> Result<Output> {
    let output = executor.run(program, args)?;
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    Err(IntegratorError::CommandFailed {
        program: program.to_owned(),
        status: output.status.code(),
        stderr,
    })
}
