//! Integration pipeline orchestration.
//!
//! Runs the six steps in order (privilege check, backup, repository
//! registration, key import, pin policy, index refresh) and stops at the
//! first failure, reporting which [`Step`] it occurred in. Progress and
//! backup warnings are written through a [`Console`].

use crate::backup::{Clock, backup_apt_config};
use crate::config::IntegratorConfig;
use crate::descriptor::render_source_list;
use crate::download::KeyDownloader;
use crate::error::{IntegratorError, Result};
use crate::executor::CommandExecutor;
use crate::keyring::import_signing_key;
use crate::output::Console;
use crate::pin::PinPolicy;
use crate::privilege::{IdentitySource, ensure_superuser};
use crate::refresh::{refresh_command_line, refresh_index};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs;

/// One stage of the integration pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Confirm the process runs as the superuser.
    PrivilegeCheck,
    /// Copy existing APT configuration aside.
    Backup,
    /// Write the Source List File.
    RepositoryRegistration,
    /// Download and trust the signing key.
    KeyImport,
    /// Write the Pin Policy File.
    PinPolicy,
    /// Refresh the package indices.
    IndexRefresh,
}

impl Step {
    /// Returns the step's short name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrivilegeCheck => "privilege check",
            Self::Backup => "configuration backup",
            Self::RepositoryRegistration => "repository registration",
            Self::KeyImport => "key import",
            Self::PinPolicy => "pin policy",
            Self::IndexRefresh => "index refresh",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fatal error together with the step it stopped.
#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {error}")]
pub struct StepFailure {
    /// The step that failed.
    pub step: Step,
    /// What went wrong.
    #[source]
    pub error: IntegratorError,
}

impl StepFailure {
    /// Returns the process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

trait InStep<T> {
    fn in_step(self, step: Step) -> std::result::Result<T, StepFailure>;
}

impl<T> InStep<T> for Result<T> {
    fn in_step(self, step: Step) -> std::result::Result<T, StepFailure> {
        self.map_err(|error| StepFailure { step, error })
    }
}

/// Host services the pipeline depends on.
pub struct Collaborators<'a> {
    /// Source of the effective UID.
    pub identity: &'a dyn IdentitySource,
    /// Fetches the signing key.
    pub downloader: &'a dyn KeyDownloader,
    /// Runs `apt-key` and `apt-get`.
    pub executor: &'a dyn CommandExecutor,
    /// Names the backup directory.
    pub clock: &'a dyn Clock,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationReport {
    /// Backup directory created, if any.
    pub backup_dir: Option<Utf8PathBuf>,
    /// Number of files copied into the backup.
    pub backed_up_files: usize,
    /// Number of backup problems reported as warnings.
    pub backup_warnings: usize,
    /// Source List File written.
    pub source_list: Utf8PathBuf,
    /// Pin Policy File written.
    pub pin_policy: Utf8PathBuf,
}

/// Integrates the configured secondary repository into the host's APT setup.
///
/// # Errors
///
/// Returns a [`StepFailure`] naming the first step that failed. Nothing is
/// written when the privilege check fails, and no step after a failing one
/// runs.
pub fn integrate(
    config: &IntegratorConfig,
    collaborators: &Collaborators<'_>,
    console: &mut Console<'_>,
) -> std::result::Result<IntegrationReport, StepFailure> {
    let paths = &config.paths;

    ensure_superuser(collaborators.identity).in_step(Step::PrivilegeCheck)?;

    console.info(format!("Backing up APT configuration to {}", paths.backup_root));
    let backup = backup_apt_config(&paths.apt_root, &paths.backup_root, collaborators.clock.now());
    for warning in backup.warnings() {
        console.warning(warning);
    }
    if let Some(dir) = backup.directory() {
        console.info(format!("Backed up {} file(s) to {dir}", backup.copied().len()));
    }

    console.info(format!("Writing {}", paths.source_list));
    write_config_file(&paths.source_list, &render_source_list(&config.repository))
        .in_step(Step::RepositoryRegistration)?;

    console.info(format!("Importing signing key from {}", config.key_url));
    import_signing_key(
        &config.key_url,
        &paths.temp_key,
        &config.trust_store,
        collaborators.downloader,
        collaborators.executor,
    )
    .in_step(Step::KeyImport)?;

    console.info(format!("Writing {}", paths.pin_policy));
    let pin = PinPolicy::for_release(&config.repository.distribution, config.pin_priority);
    write_config_file(&paths.pin_policy, &pin.render()).in_step(Step::PinPolicy)?;

    console.info(format!("Running {}", refresh_command_line()));
    refresh_index(collaborators.executor).in_step(Step::IndexRefresh)?;

    console.info(format!(
        "{} packages are available with: apt-get install -t {} <package>",
        config.repository.distribution, config.repository.distribution
    ));

    Ok(IntegrationReport {
        backup_dir: backup.directory().map(Utf8Path::to_path_buf),
        backed_up_files: backup.copied().len(),
        backup_warnings: backup.warnings().len(),
        source_list: paths.source_list.clone(),
        pin_policy: paths.pin_policy.clone(),
    })
}

/// Replaces `path` with `contents`, creating parent directories as needed.
fn write_config_file(path: &Utf8Path, contents: &str) -> Result<()> {
    let write_failed = |source: std::io::Error| IntegratorError::WriteFailed {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }
    fs::write(path, contents).map_err(write_failed)?;
    log::debug!("wrote {} bytes to {path}", contents.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetPaths;
    use crate::keyring::APT_KEY_PROGRAM;
    use crate::test_utils::{
        ExpectedCall, FixedClock, FixedIdentity, StubDownloader, StubExecutor, StubResponse,
        exit_status, success_output,
    };
    use rstest::{fixture, rstest};
    use std::process::Output;
    use tempfile::TempDir;

    const NOW: u64 = 1_700_000_000;

    struct Sandbox {
        _temp: TempDir,
        config: IntegratorConfig,
    }

    #[fixture]
    fn sandbox() -> Sandbox {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8 path");
        let config = IntegratorConfig {
            paths: TargetPaths::rooted_at(&root),
            ..IntegratorConfig::default()
        };
        Sandbox {
            _temp: temp,
            config,
        }
    }

    fn leak(text: String) -> &'static str {
        Box::leak(text.into_boxed_str())
    }

    fn expected_calls(config: &IntegratorConfig, refresh: Output) -> Vec<ExpectedCall> {
        vec![
            ExpectedCall {
                cmd: APT_KEY_PROGRAM,
                args: vec!["add", leak(config.paths.temp_key.to_string())],
                result: Ok(success_output()),
            },
            ExpectedCall {
                cmd: "apt-get",
                args: vec!["-qq", "update"],
                result: Ok(refresh),
            },
        ]
    }

    struct Run {
        result: std::result::Result<IntegrationReport, StepFailure>,
        stdout: String,
        stderr: String,
    }

    fn run(
        config: &IntegratorConfig,
        identity: FixedIdentity,
        downloader: &StubDownloader,
        executor: &StubExecutor,
        quiet: bool,
    ) -> Run {
        let clock = FixedClock::at(NOW);
        let collaborators = Collaborators {
            identity: &identity,
            downloader,
            executor,
            clock: &clock,
        };
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let result = {
            let mut console = Console::new(&mut stdout, &mut stderr, quiet);
            integrate(config, &collaborators, &mut console)
        };
        Run {
            result,
            stdout: String::from_utf8(stdout).expect("utf8 stdout"),
            stderr: String::from_utf8(stderr).expect("utf8 stderr"),
        }
    }

    #[rstest]
    fn successful_run_writes_both_files(sandbox: Sandbox) {
        let config = &sandbox.config;
        let executor = StubExecutor::new(expected_calls(config, success_output()));
        let outcome = run(
            config,
            FixedIdentity::root(),
            &StubDownloader::serving_key(),
            &executor,
            false,
        );

        let report = outcome.result.expect("integration");
        executor.assert_finished();
        assert_eq!(
            fs::read_to_string(&config.paths.source_list).expect("source list"),
            render_source_list(&config.repository)
        );
        assert_eq!(
            fs::read_to_string(&config.paths.pin_policy).expect("pin policy"),
            "Package: *\nPin: release a=kali-rolling\nPin-Priority: 50\n"
        );
        assert_eq!(
            report.backup_dir,
            Some(config.paths.backup_root.join("20231114-221320"))
        );
        assert_eq!(report.backed_up_files, 0);
        assert!(!config.paths.temp_key.exists());
        assert!(outcome.stdout.contains("==> Writing"));
        assert!(outcome.stdout.contains("apt-get install -t kali-rolling <package>"));
        assert!(outcome.stderr.is_empty());
    }

    #[rstest]
    fn non_root_run_touches_nothing(sandbox: Sandbox) {
        let config = &sandbox.config;
        let downloader = StubDownloader::serving_key();
        let executor = StubExecutor::new(Vec::new());
        let outcome = run(config, FixedIdentity::new(1000), &downloader, &executor, false);

        let failure = outcome.result.expect_err("non-root must fail");
        assert_eq!(failure.step, Step::PrivilegeCheck);
        assert_eq!(failure.exit_code(), 1);
        assert!(!config.paths.backup_root.exists());
        assert!(!config.paths.source_list.exists());
        assert!(!config.paths.pin_policy.exists());
        assert_eq!(downloader.calls(), 0);
        assert!(executor.received().is_empty());
        assert!(outcome.stdout.is_empty());
    }

    #[rstest]
    fn failed_download_stops_before_pin_policy(sandbox: Sandbox) {
        let config = &sandbox.config;
        let executor = StubExecutor::new(Vec::new());
        let outcome = run(
            config,
            FixedIdentity::new(0),
            &StubDownloader::new(StubResponse::Unreachable),
            &executor,
            false,
        );

        let failure = outcome.result.expect_err("download must fail");
        assert_eq!(failure.step, Step::KeyImport);
        assert!(failure.to_string().starts_with("key import failed: "));
        assert!(config.paths.source_list.exists());
        assert!(!config.paths.pin_policy.exists());
        assert!(!config.paths.temp_key.exists());
        assert!(executor.received().is_empty());
    }

    #[rstest]
    fn refresh_failure_propagates_status(sandbox: Sandbox) {
        let config = &sandbox.config;
        let refresh = Output {
            status: exit_status(100),
            stdout: Vec::new(),
            stderr: b"E: Failed to fetch".to_vec(),
        };
        let executor = StubExecutor::new(expected_calls(config, refresh));
        let outcome = run(
            config,
            FixedIdentity::root(),
            &StubDownloader::serving_key(),
            &executor,
            false,
        );

        let failure = outcome.result.expect_err("refresh must fail");
        assert_eq!(failure.step, Step::IndexRefresh);
        assert_eq!(failure.exit_code(), 100);
        assert!(config.paths.pin_policy.exists());
    }

    #[rstest]
    fn existing_configuration_is_backed_up_and_reported(sandbox: Sandbox) {
        let config = &sandbox.config;
        let apt_root = &config.paths.apt_root;
        fs::create_dir_all(apt_root.join("sources.list.d")).expect("mkdir");
        fs::write(apt_root.join("sources.list"), "deb http://deb.debian.org/debian bookworm main\n")
            .expect("write sources.list");
        fs::write(apt_root.join("sources.list.d/kali.list"), "stale\n").expect("write kali.list");

        let executor = StubExecutor::new(expected_calls(config, success_output()));
        let outcome = run(
            config,
            FixedIdentity::root(),
            &StubDownloader::serving_key(),
            &executor,
            true,
        );

        let report = outcome.result.expect("integration");
        assert_eq!(report.backed_up_files, 2);
        let backup_dir = report.backup_dir.expect("backup dir");
        assert_eq!(
            fs::read_to_string(backup_dir.join("sources.list.d/kali.list")).expect("backup copy"),
            "stale\n"
        );
        assert!(outcome.stdout.is_empty(), "quiet run printed: {}", outcome.stdout);
    }

    #[rstest]
    fn backup_problems_are_warnings(sandbox: Sandbox) {
        let config = &sandbox.config;
        let parent = config.paths.backup_root.parent().expect("backup parent");
        fs::create_dir_all(parent).expect("mkdir");
        fs::write(&config.paths.backup_root, "not a directory").expect("write blocker");

        let executor = StubExecutor::new(expected_calls(config, success_output()));
        let outcome = run(
            config,
            FixedIdentity::root(),
            &StubDownloader::serving_key(),
            &executor,
            false,
        );

        let report = outcome.result.expect("backup must not block the run");
        assert_eq!(report.backup_dir, None);
        assert_eq!(report.backup_warnings, 1);
        assert!(outcome.stderr.starts_with("WARNING: could not back up"));
        assert!(config.paths.pin_policy.exists());
    }

    #[rstest]
    #[case::privilege(Step::PrivilegeCheck, "privilege check")]
    #[case::backup(Step::Backup, "configuration backup")]
    #[case::registration(Step::RepositoryRegistration, "repository registration")]
    #[case::key(Step::KeyImport, "key import")]
    #[case::pin(Step::PinPolicy, "pin policy")]
    #[case::refresh(Step::IndexRefresh, "index refresh")]
    fn steps_display_their_names(#[case] step: Step, #[case] expected: &str) {
        assert_eq!(step.to_string(), expected);
    }
}
