//! Timestamped backup of existing APT source and pinning configuration.
//!
//! Before anything is written, the current `sources.list`, `sources.list.d/`,
//! `preferences` and `preferences.d/` are copied into a fresh directory under
//! the backups root, keeping their layout relative to the APT configuration
//! root. Restoring from a backup is a manual operation.
//!
//! Backups never block the run. A file that does not exist is simply not
//! backed up; any other problem is collected as a [`BackupWarning`] for the
//! caller to report.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::time::{SystemTime, UNIX_EPOCH};

/// Individual files backed up, relative to the APT configuration root.
pub const BACKED_UP_FILES: [&str; 2] = ["sources.list", "preferences"];

/// Directories whose files are backed up, relative to the APT configuration root.
pub const BACKED_UP_DIRS: [&str; 2] = ["sources.list.d", "preferences.d"];

/// Highest numeric suffix tried when same-second backups collide.
const MAX_SUFFIX: u32 = 999;

/// Source of the current time, used to name backup directories.
pub trait Clock {
    /// Returns the current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A backup problem that was tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupWarning {
    /// The path that could not be backed up.
    pub path: Utf8PathBuf,
    /// Description of the underlying failure.
    pub reason: String,
}

impl fmt::Display for BackupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not back up {}: {}", self.path, self.reason)
    }
}

/// Outcome of the backup step.
#[derive(Debug, Default)]
pub struct BackupReport {
    directory: Option<Utf8PathBuf>,
    copied: Vec<Utf8PathBuf>,
    warnings: Vec<BackupWarning>,
}

impl BackupReport {
    /// Returns the backup directory, or `None` if it could not be created.
    #[must_use]
    pub fn directory(&self) -> Option<&Utf8Path> {
        self.directory.as_deref()
    }

    /// Returns the destination paths of every copied file.
    #[must_use]
    pub fn copied(&self) -> &[Utf8PathBuf] {
        &self.copied
    }

    /// Returns the tolerated failures.
    #[must_use]
    pub fn warnings(&self) -> &[BackupWarning] {
        &self.warnings
    }

    fn warn(&mut self, path: Utf8PathBuf, error: &io::Error) {
        log::debug!("backup of {path} failed: {error:?}");
        self.warnings.push(BackupWarning {
            path,
            reason: error.to_string(),
        });
    }
}

/// Copies the APT source and pinning configuration into a new backup directory.
///
/// The directory is named by [`backup_dir_name`] for `now`. If that name is
/// already taken (two runs within the same second) a `-1`, `-2`, ... suffix
/// is appended, so an earlier backup is never written into.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use repo_integrator::backup::backup_apt_config;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let temp = tempfile::tempdir()?;
/// let root = Utf8PathBuf::try_from(temp.path().to_path_buf())?;
/// let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
///
/// let report = backup_apt_config(&root.join("etc/apt"), &root.join("backups"), now);
/// assert_eq!(report.directory(), Some(root.join("backups/20231114-221320").as_path()));
/// assert!(report.copied().is_empty());
/// assert!(report.warnings().is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn backup_apt_config(
    apt_root: &Utf8Path,
    backup_root: &Utf8Path,
    now: SystemTime,
) -> BackupReport {
    let mut report = BackupReport::default();
    let epoch_secs = now.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    let name = backup_dir_name(epoch_secs);

    let directory = match create_unique_dir(backup_root, &name) {
        Ok(directory) => directory,
        Err(error) => {
            report.warn(backup_root.join(&name), &error);
            return report;
        }
    };
    log::debug!("backing up {apt_root} to {directory}");

    for file in BACKED_UP_FILES {
        copy_file(apt_root, &directory, Utf8Path::new(file), &mut report);
    }
    for dir in BACKED_UP_DIRS {
        copy_directory(apt_root, &directory, Utf8Path::new(dir), &mut report);
    }

    report.directory = Some(directory);
    report
}

/// Formats a Unix timestamp as a UTC backup directory name, `YYYYMMDD-HHMMSS`.
///
/// # Examples
///
/// ```
/// use repo_integrator::backup::backup_dir_name;
///
/// assert_eq!(backup_dir_name(0), "19700101-000000");
/// assert_eq!(backup_dir_name(1_709_251_199), "20240229-235959");
/// ```
#[must_use]
pub fn backup_dir_name(epoch_secs: u64) -> String {
    let (year, month, day) = civil_from_days(epoch_secs / 86_400);
    let day_secs = epoch_secs % 86_400;
    let hour = day_secs / 3_600;
    let minute = (day_secs % 3_600) / 60;
    let second = day_secs % 60;
    format!("{year:04}{month:02}{day:02}-{hour:02}{minute:02}{second:02}")
}

/// Converts days since the Unix epoch to a `(year, month, day)` triple.
///
/// Howard Hinnant's `civil_from_days` algorithm, restricted to dates on or
/// after 1970-01-01 so that every intermediate value stays unsigned.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097; // day of era [0, 146_096]
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

/// Creates `root/name`, or the first free `root/name-N`.
fn create_unique_dir(root: &Utf8Path, name: &str) -> io::Result<Utf8PathBuf> {
    fs::create_dir_all(root)?;
    for attempt in 0..=MAX_SUFFIX {
        let candidate = if attempt == 0 {
            root.join(name)
        } else {
            root.join(format!("{name}-{attempt}"))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }
    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("{MAX_SUFFIX} backups named {name} already exist"),
    ))
}

fn copy_file(
    apt_root: &Utf8Path,
    backup_dir: &Utf8Path,
    relative: &Utf8Path,
    report: &mut BackupReport,
) {
    let source = apt_root.join(relative);
    let dest = backup_dir.join(relative);
    let result = dest
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::copy(&source, &dest));

    match result {
        Ok(_) => {
            log::trace!("backed up {source}");
            report.copied.push(dest);
        }
        Err(error) if error.kind() == ErrorKind::NotFound => {
            log::trace!("{source} does not exist; nothing to back up");
        }
        Err(error) => report.warn(source, &error),
    }
}

fn copy_directory(
    apt_root: &Utf8Path,
    backup_dir: &Utf8Path,
    relative: &Utf8Path,
    report: &mut BackupReport,
) {
    let source_dir = apt_root.join(relative);
    let entries = match source_dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            log::trace!("{source_dir} does not exist; nothing to back up");
            return;
        }
        Err(error) => {
            report.warn(source_dir, &error);
            return;
        }
    };

    let mut names = Vec::new();
    for entry in entries {
        match entry {
            // Subdirectories are ignored by APT, so they are not backed up either.
            Ok(entry) if entry.path().is_file() => names.push(entry.file_name().to_owned()),
            Ok(_) => {}
            Err(error) => report.warn(source_dir.clone(), &error),
        }
    }
    names.sort();

    for name in names {
        copy_file(apt_root, backup_dir, &relative.join(name), report);
    }
}
