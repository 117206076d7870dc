//! Signing key import.
//!
//! The key is downloaded to a temporary file and handed to the configured
//! [`TrustStore`]. The temporary file is owned by a [`TempKeyFile`] guard and
//! removed when the step ends, whether or not the import succeeded.
//!
//! The temporary path is predictable and usually lives in a world-writable
//! directory, so the file is always freshly created: any existing entry is
//! removed first and the file is opened exclusively without following
//! symlinks.

use crate::config::TrustStore;
use crate::download::KeyDownloader;
use crate::error::{IntegratorError, Result};
use crate::executor::{CommandExecutor, run_checked};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// Program used by the `apt-key` trust store.
pub const APT_KEY_PROGRAM: &str = "apt-key";

/// Permissions of an installed keyring file.
const KEYRING_MODE: u32 = 0o644;

/// Permissions of the temporary key file.
const TEMP_KEY_MODE: u32 = 0o600;

/// Removes the temporary key file when dropped.
#[derive(Debug)]
pub struct TempKeyFile {
    path: Utf8PathBuf,
}

impl TempKeyFile {
    /// Takes ownership of `path`, which need not exist yet.
    #[must_use]
    pub fn new(path: &Utf8Path) -> Self {
        Self {
            path: path.to_owned(),
        }
    }

    /// Returns the guarded path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for TempKeyFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::trace!("removed {}", self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not remove temporary key file {}: {e}", self.path),
        }
    }
}

/// Downloads the signing key and registers it with `trust_store`.
///
/// # Errors
///
/// Returns [`IntegratorError::KeyDownload`] or [`IntegratorError::KeyNotFound`]
/// when the download fails, [`IntegratorError::CommandFailed`] when `apt-key`
/// rejects the key, and [`IntegratorError::WriteFailed`] when the temporary
/// key file cannot be created or the keyring file cannot be installed.
pub fn import_signing_key(
    key_url: &str,
    temp_key: &Utf8Path,
    trust_store: &TrustStore,
    downloader: &dyn KeyDownloader,
    executor: &dyn CommandExecutor,
) -> Result<()> {
    let guard = TempKeyFile::new(temp_key);
    if let Some(parent) = guard.path().parent() {
        fs::create_dir_all(parent).map_err(|source| IntegratorError::WriteFailed {
            path: parent.to_owned(),
            source,
        })?;
    }
    let mut key_file = create_key_file(guard.path())?;
    downloader
        .download_key(key_url, &mut key_file)
        .map_err(|e| e.into_integrator_error(key_url))?;
    drop(key_file);

    match trust_store {
        TrustStore::AptKey => {
            run_checked(executor, APT_KEY_PROGRAM, &["add", guard.path().as_str()])?;
        }
        TrustStore::Keyring { path } => install_keyring(guard.path(), path)?,
    }
    Ok(())
}

/// Creates an empty key file at `path`, replacing whatever entry was there.
fn create_key_file(path: &Utf8Path) -> Result<File> {
    let write_failed = |source: std::io::Error| IntegratorError::WriteFailed {
        path: path.to_owned(),
        source,
    };
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed stale entry at {path}"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(write_failed(e)),
    }
    open_exclusive(path).map_err(write_failed)
}

/// Opens a new file at `path`, failing if any entry (including a dangling
/// symlink) already exists.
fn open_exclusive(path: &Utf8Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(TEMP_KEY_MODE)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)
}

fn install_keyring(key_file: &Utf8Path, destination: &Utf8Path) -> Result<()> {
    let write_failed = |source: std::io::Error| IntegratorError::WriteFailed {
        path: destination.to_owned(),
        source,
    };
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }
    fs::copy(key_file, destination).map_err(write_failed)?;
    fs::set_permissions(destination, fs::Permissions::from_mode(KEYRING_MODE))
        .map_err(write_failed)?;
    log::debug!("installed signing key at {destination}");
    Ok(())
}
