//! Package index refresh.

use crate::error::Result;
use crate::executor::{CommandExecutor, run_checked};

/// Program that refreshes the package indices.
pub const REFRESH_PROGRAM: &str = "apt-get";

/// Arguments passed to [`REFRESH_PROGRAM`].
pub const REFRESH_ARGS: [&str; 2] = ["-qq", "update"];

/// Returns the refresh command line as it would be typed in a shell.
#[must_use]
pub fn refresh_command_line() -> String {
    format!("{REFRESH_PROGRAM} {}", REFRESH_ARGS.join(" "))
}

/// Runs `apt-get -qq update` so the new repository's indices are fetched.
///
/// # Errors
///
/// Returns [`crate::error::IntegratorError::CommandFailed`] with the child's
/// exit status if the update fails.
pub fn refresh_index(executor: &dyn CommandExecutor) -> Result<()> {
    run_checked(executor, REFRESH_PROGRAM, &REFRESH_ARGS)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntegratorError;
    use crate::test_utils::{ExpectedCall, StubExecutor, exit_status, success_output};
    use std::process::Output;

    #[test]
    fn runs_quiet_update() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "apt-get",
            args: vec!["-qq", "update"],
            result: Ok(success_output()),
        }]);
        refresh_index(&executor).expect("refresh");
        executor.assert_finished();
    }

    #[test]
    fn failure_propagates_exit_status() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "apt-get",
            args: vec!["-qq", "update"],
            result: Ok(Output {
                status: exit_status(100),
                stdout: Vec::new(),
                stderr: b"E: The repository does not have a Release file.".to_vec(),
            }),
        }]);
        let err = refresh_index(&executor).expect_err("refresh failure");
        assert_eq!(err.exit_code(), 100);
        assert!(matches!(err, IntegratorError::CommandFailed { .. }));
    }

    #[test]
    fn command_line_is_printable() {
        assert_eq!(refresh_command_line(), "apt-get -qq update");
    }
}
