//! CLI argument definitions for the repository integrator.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use log::LevelFilter;

/// Register a low-priority secondary APT repository.
#[derive(Parser, Debug, Default)]
#[command(name = "repo-integrator")]
#[command(version, about)]
#[command(long_about = concat!(
    "Register a low-priority secondary APT repository.\n\n",
    "By default the Kali Linux rolling archive is added to a Debian host. The ",
    "existing source and preferences configuration is backed up, the repository ",
    "and its signing key are registered, and a pin policy keeps its packages ",
    "below the default release so they are only installed when requested with ",
    "`apt-get install -t kali-rolling <package>`.\n\n",
    "Must be run as root unless --dry-run is given.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Add the Kali rolling repository:\n",
    "    $ sudo repo-integrator\n\n",
    "  Preview the files that would be written:\n",
    "    $ repo-integrator --dry-run\n\n",
    "  Use a configuration file and show debug diagnostics:\n",
    "    $ sudo repo-integrator --config /etc/repo-integrator.toml -v\n\n",
    "  Install a package from the secondary repository afterwards:\n",
    "    $ sudo apt-get install -t kali-rolling nmap",
))]
pub struct Cli {
    /// Read settings from a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Show what would be done without changing the system.
    #[arg(long)]
    pub dry_run: bool,

    /// Show diagnostics (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress progress output; warnings and errors are still shown.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Returns the maximum diagnostic level selected by the flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use log::LevelFilter;
    /// use repo_integrator::cli::Cli;
    ///
    /// assert_eq!(Cli::default().log_level(), LevelFilter::Warn);
    /// assert_eq!(Cli { verbose: 1, ..Cli::default() }.log_level(), LevelFilter::Debug);
    /// ```
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
