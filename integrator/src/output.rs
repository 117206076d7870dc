//! User-facing console output.
//!
//! Progress goes to stdout with a `==> ` prefix; warnings and errors go to
//! stderr. All helpers take injected writers so the pipeline's output can be
//! captured in tests.

use crate::backup::{BACKED_UP_DIRS, BACKED_UP_FILES};
use crate::config::{IntegratorConfig, TrustStore};
use crate::descriptor::render_source_list;
use crate::pin::PinPolicy;
use crate::refresh::refresh_command_line;
use std::fmt::Display;
use std::io::Write;

/// Prefix of informational lines.
pub const INFO_PREFIX: &str = "==> ";
/// Prefix of warning lines.
pub const WARNING_PREFIX: &str = "WARNING: ";
/// Prefix of error lines.
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Writes a `==> ` progress line.
pub fn write_info_line(out: &mut dyn Write, message: impl Display) {
    write_prefixed_line(out, INFO_PREFIX, message);
}

/// Writes a `WARNING: ` line.
pub fn write_warning_line(err: &mut dyn Write, message: impl Display) {
    write_prefixed_line(err, WARNING_PREFIX, message);
}

/// Writes an `ERROR: ` line.
pub fn write_error_line(err: &mut dyn Write, message: impl Display) {
    write_prefixed_line(err, ERROR_PREFIX, message);
}

fn write_prefixed_line(writer: &mut dyn Write, prefix: &str, message: impl Display) {
    if writeln!(writer, "{prefix}{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Destination of the pipeline's console output.
pub struct Console<'a> {
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
    quiet: bool,
}

impl<'a> Console<'a> {
    /// Creates a console writing progress to `out` and diagnostics to `err`.
    ///
    /// With `quiet` set, progress lines are dropped; warnings are always
    /// written.
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write, quiet: bool) -> Self {
        Self { out, err, quiet }
    }

    /// Reports progress unless quiet.
    pub fn info(&mut self, message: impl Display) {
        if !self.quiet {
            write_info_line(self.out, message);
        }
    }

    /// Reports a tolerated problem.
    pub fn warning(&mut self, message: impl Display) {
        write_warning_line(self.err, message);
    }
}

/// Describes what a run would do without doing it.
///
/// # Examples
///
/// ```
/// use repo_integrator::config::IntegratorConfig;
/// use repo_integrator::output::DryRunInfo;
///
/// let config = IntegratorConfig::default();
/// let text = DryRunInfo { config: &config }.display_text();
/// assert!(text.contains("Dry run"));
/// assert!(text.contains("deb http://http.kali.org/kali kali-rolling main non-free contrib"));
/// assert!(text.contains("Pin-Priority: 50"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The resolved configuration.
    pub config: &'a IntegratorConfig,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let paths = &config.paths;
        let pin = PinPolicy::for_release(&config.repository.distribution, config.pin_priority);

        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!(
                "Backup: {} and {} from {} into {}/<timestamp>",
                BACKED_UP_FILES.join(", "),
                BACKED_UP_DIRS.map(|dir| format!("{dir}/")).join(", "),
                paths.apt_root,
                paths.backup_root,
            ),
            format!("Key URL: {}", config.key_url),
            format!("Temporary key file: {}", paths.temp_key),
        ];
        lines.push(match &config.trust_store {
            TrustStore::AptKey => format!("Trust store: apt-key add {}", paths.temp_key),
            TrustStore::Keyring { path } => format!("Trust store: keyring at {path}"),
        });
        if let Some(timeout) = config.download_timeout_secs {
            lines.push(format!("Download timeout: {timeout}s"));
        }
        lines.push(format!("Index refresh: {}", refresh_command_line()));

        lines.push(String::new());
        lines.push(format!("Source list ({}):", paths.source_list));
        lines.extend(render_source_list(&config.repository).lines().map(indent));
        lines.push(String::new());
        lines.push(format!("Pin policy ({}):", paths.pin_policy));
        lines.extend(pin.render().lines().map(indent));

        lines.join("\n")
    }
}

fn indent(line: &str) -> String {
    format!("  {line}")
}
