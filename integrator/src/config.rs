//! Integrator configuration.
//!
//! Every value has a compiled-in default describing the Kali Linux rolling
//! archive, so running without a configuration file integrates Kali. A TOML
//! file can override any subset of the values:
//!
//! ```toml
//! key_url = "https://archive.kali.org/archive-key.asc"
//! pin_priority = 50
//! download_timeout_secs = 60
//!
//! [repository]
//! url = "http://http.kali.org/kali"
//! distribution = "kali-rolling"
//! components = ["main", "non-free", "contrib"]
//!
//! [trust_store]
//! kind = "keyring"
//! path = "/etc/apt/trusted.gpg.d/kali-archive-keyring.asc"
//!
//! [paths]
//! source_list = "/etc/apt/sources.list.d/kali.list"
//! ```

use crate::descriptor::{RepositoryDescriptor, require_token};
use crate::error::{IntegratorError, Result};
use crate::pin::{DEFAULT_PIN_PRIORITY, validate_priority};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// URL of the Kali Linux archive signing key.
pub const DEFAULT_KEY_URL: &str = "https://archive.kali.org/archive-key.asc";

/// Keyring file used by the `keyring` trust store.
pub const DEFAULT_KEYRING_PATH: &str = "/etc/apt/trusted.gpg.d/kali-archive-keyring.asc";

/// Where the signing key is registered.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TrustStore {
    /// Hand the key to `apt-key add`.
    #[default]
    AptKey,
    /// Install the key as a world-readable file in a trusted keyring directory.
    Keyring {
        /// Destination of the key file.
        #[serde(default = "default_keyring_path")]
        path: Utf8PathBuf,
    },
}

impl TrustStore {
    /// Returns the `keyring` trust store at its default location.
    #[must_use]
    pub fn default_keyring() -> Self {
        Self::Keyring {
            path: default_keyring_path(),
        }
    }
}

fn default_keyring_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_KEYRING_PATH)
}

/// Filesystem locations read and written by the integrator.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetPaths {
    /// APT configuration root whose sources and preferences are backed up.
    pub apt_root: Utf8PathBuf,
    /// Source List File for the secondary repository.
    pub source_list: Utf8PathBuf,
    /// Pin Policy File for the secondary repository.
    pub pin_policy: Utf8PathBuf,
    /// Directory receiving the timestamped backups.
    pub backup_root: Utf8PathBuf,
    /// Temporary location of the downloaded signing key.
    pub temp_key: Utf8PathBuf,
}

impl Default for TargetPaths {
    fn default() -> Self {
        Self::rooted_at(Utf8Path::new("/"))
    }
}

impl TargetPaths {
    /// Returns the default layout relocated under `root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use repo_integrator::config::TargetPaths;
    ///
    /// let paths = TargetPaths::rooted_at(Utf8Path::new("/srv/chroot"));
    /// assert_eq!(paths.source_list, "/srv/chroot/etc/apt/sources.list.d/kali.list");
    /// assert_eq!(paths.backup_root, "/srv/chroot/var/backups/repo-integrator");
    /// ```
    #[must_use]
    pub fn rooted_at(root: &Utf8Path) -> Self {
        let apt_root = root.join("etc/apt");
        Self {
            source_list: apt_root.join("sources.list.d/kali.list"),
            pin_policy: apt_root.join("preferences.d/kali.pref"),
            apt_root,
            backup_root: root.join("var/backups/repo-integrator"),
            temp_key: root.join("tmp/repo-integrator-archive-key.asc"),
        }
    }
}

/// Complete configuration of one integration run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    /// The secondary repository to register.
    pub repository: RepositoryDescriptor,
    /// HTTPS URL of the repository's signing key.
    pub key_url: String,
    /// Pin priority for every package of the secondary release.
    pub pin_priority: i32,
    /// Where the signing key is registered.
    pub trust_store: TrustStore,
    /// Upper bound on the key download, in seconds.
    pub download_timeout_secs: Option<u64>,
    /// Files and directories touched by the run.
    pub paths: TargetPaths,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            repository: RepositoryDescriptor::default(),
            key_url: DEFAULT_KEY_URL.to_owned(),
            pin_priority: DEFAULT_PIN_PRIORITY,
            trust_store: TrustStore::default(),
            download_timeout_secs: None,
            paths: TargetPaths::default(),
        }
    }
}

impl IntegratorConfig {
    /// Reads and validates a TOML configuration file.
    ///
    /// Values absent from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`IntegratorError::ConfigLoad`] if the file cannot be read or
    /// parsed (including unknown keys), and [`IntegratorError::InvalidConfig`]
    /// if the parsed values fail [`IntegratorConfig::validate`].
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IntegratorError::ConfigLoad {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&text).map_err(|reason| IntegratorError::ConfigLoad {
            path: path.to_owned(),
            reason,
        })?;
        config.validate()?;
        log::debug!("loaded configuration from {path}");
        Ok(config)
    }

    fn from_toml(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e: toml::de::Error| e.to_string())
    }

    /// Checks that the configuration can produce well-formed files.
    ///
    /// # Errors
    ///
    /// Returns [`IntegratorError::InvalidConfig`] when the repository
    /// descriptor is malformed, the key URL is not HTTPS, or the pin priority
    /// would not demote the secondary release.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_integrator::config::IntegratorConfig;
    ///
    /// let mut config = IntegratorConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.key_url = "http://archive.kali.org/archive-key.asc".to_owned();
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        self.repository.validate()?;
        require_token("key url", &self.key_url)?;
        if !self.key_url.starts_with("https://") {
            return Err(IntegratorError::InvalidConfig {
                reason: format!("key url {} must use https", self.key_url),
            });
        }
        validate_priority(self.pin_priority)?;
        if self.download_timeout_secs == Some(0) {
            return Err(IntegratorError::InvalidConfig {
                reason: "download_timeout_secs must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    /// Returns the key download timeout, if one is configured.
    #[must_use]
    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }
}
