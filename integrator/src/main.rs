//! Repository integrator CLI entrypoint.
//!
//! This binary backs up the host's APT source and pinning configuration,
//! registers the secondary repository and its signing key, pins it below the
//! default release, and refreshes the package indices.

use clap::Parser;
use repo_integrator::backup::SystemClock;
use repo_integrator::cli::Cli;
use repo_integrator::config::IntegratorConfig;
use repo_integrator::download::HttpDownloader;
use repo_integrator::error::IntegratorError;
use repo_integrator::executor::SystemCommandExecutor;
use repo_integrator::logging;
use repo_integrator::output::{Console, DryRunInfo, write_error_line};
use repo_integrator::pipeline::{Collaborators, StepFailure, integrate};
use repo_integrator::privilege::SystemIdentity;
use std::io::Write;

/// Why a run did not complete.
#[derive(Debug)]
enum Failure {
    /// The configuration could not be loaded.
    Config(IntegratorError),
    /// A pipeline step failed.
    Step(StepFailure),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Config(err) => err.exit_code(),
            Self::Step(failure) => failure.exit_code(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Step(failure) => write!(f, "{failure}"),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if logging::init(cli.log_level()).is_err() {
        // A subscriber is already installed; keep using it.
    }
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<(), Failure> {
    let config = load_config(cli).map_err(Failure::Config)?;

    // Dry-run mode: show what would be done without side effects
    if cli.dry_run {
        write_stdout_line(stdout, DryRunInfo { config: &config }.display_text());
        return Ok(());
    }

    let downloader = HttpDownloader::new(config.download_timeout());
    let collaborators = Collaborators {
        identity: &SystemIdentity,
        downloader: &downloader,
        executor: &SystemCommandExecutor,
        clock: &SystemClock,
    };
    let mut console = Console::new(stdout, stderr, cli.quiet);
    let report = integrate(&config, &collaborators, &mut console).map_err(Failure::Step)?;
    log::debug!("integration finished: {report:?}");
    Ok(())
}

fn load_config(cli: &Cli) -> repo_integrator::error::Result<IntegratorConfig> {
    match &cli.config {
        Some(path) => IntegratorConfig::load(path),
        None => Ok(IntegratorConfig::default()),
    }
}

fn exit_code_for_run_result(result: Result<(), Failure>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(failure) => {
            write_error_line(stderr, &failure);
            failure.exit_code()
        }
    }
}

fn write_stdout_line(stdout: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stdout, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}
