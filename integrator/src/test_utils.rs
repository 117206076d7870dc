//! Shared test utilities for the integrator crate.

use crate::backup::Clock;
use crate::download::{DownloadError, KeyDownloader};
use crate::error::{IntegratorError, Result};
use crate::executor::CommandExecutor;
use crate::privilege::IdentitySource;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::process::{ExitStatus, Output};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Creates an `ExitStatus` from an exit code.
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "apt-get").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Returns predefined results for the expected invocations, in order. An
/// invocation that does not match the next expectation yields
/// [`IntegratorError::StubMismatch`].
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    received: RefCell<Vec<String>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            received: RefCell::new(Vec::new()),
        }
    }

    /// Returns every invocation received so far as `cmd arg...` strings.
    #[must_use]
    pub fn received(&self) -> Vec<String> {
        self.received.borrow().clone()
    }

    /// Returns `true` when every expected invocation has been consumed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.expected.borrow().is_empty()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(self.is_finished(), "expected no further command invocations");
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let invocation = std::iter::once(cmd)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.received.borrow_mut().push(invocation.clone());

        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(IntegratorError::StubMismatch {
                message: format!("unexpected command invocation: {invocation}"),
            });
        };
        if call.cmd != cmd || call.args.as_slice() != args {
            return Err(IntegratorError::StubMismatch {
                message: format!(
                    "expected `{} {}`, received `{invocation}`",
                    call.cmd,
                    call.args.join(" ")
                ),
            });
        }
        call.result
    }
}

/// An `IdentitySource` reporting a fixed effective UID.
#[derive(Debug, Clone, Copy)]
pub struct FixedIdentity {
    euid: u32,
}

impl FixedIdentity {
    /// Reports `euid` as the effective UID.
    #[must_use]
    pub const fn new(euid: u32) -> Self {
        Self { euid }
    }

    /// Reports the superuser.
    #[must_use]
    pub const fn root() -> Self {
        Self::new(0)
    }
}

impl IdentitySource for FixedIdentity {
    fn effective_uid(&self) -> u32 {
        self.euid
    }
}

/// A `Clock` frozen at a fixed number of seconds after the Unix epoch.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    epoch_secs: u64,
}

impl FixedClock {
    /// Freezes the clock at `epoch_secs`.
    #[must_use]
    pub const fn at(epoch_secs: u64) -> Self {
        Self { epoch_secs }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.epoch_secs)
    }
}

/// Behaviour of a [`StubDownloader`].
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// Serve the given key material.
    Key(Vec<u8>),
    /// Answer with HTTP 404.
    NotFound,
    /// Fail as if the host could not be reached.
    Unreachable,
}

/// A `KeyDownloader` that serves a canned response without network access.
#[derive(Debug)]
pub struct StubDownloader {
    response: StubResponse,
    calls: Cell<usize>,
}

impl StubDownloader {
    /// Creates a downloader answering every request with `response`.
    #[must_use]
    pub const fn new(response: StubResponse) -> Self {
        Self {
            response,
            calls: Cell::new(0),
        }
    }

    /// Serves a short armoured key.
    #[must_use]
    pub fn serving_key() -> Self {
        Self::new(StubResponse::Key(
            b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nstub\n-----END PGP PUBLIC KEY BLOCK-----\n"
                .to_vec(),
        ))
    }

    /// Returns how many downloads were requested.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl KeyDownloader for StubDownloader {
    fn download_key(&self, url: &str, dest: &mut File) -> std::result::Result<(), DownloadError> {
        self.calls.set(self.calls.get() + 1);
        match &self.response {
            StubResponse::Key(bytes) => {
                dest.write_all(bytes)?;
                Ok(())
            }
            StubResponse::NotFound => Err(DownloadError::NotFound {
                url: url.to_owned(),
            }),
            StubResponse::Unreachable => Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            }),
        }
    }
}
