//! Signing key download.
//!
//! Provides a trait-based abstraction over fetching the repository's signing
//! key so that the integration pipeline can be exercised without network
//! access. The production implementation uses `ureq` over HTTPS.

use crate::error::IntegratorError;
use std::fs::File;
use std::time::Duration;

/// Trait for downloading key material into an open file.
///
/// # Examples
///
/// ```no_run
/// use repo_integrator::download::{HttpDownloader, KeyDownloader};
/// use std::fs::File;
///
/// let mut dest = File::create("/root/archive-key.asc")?;
/// let downloader = HttpDownloader::new(None);
/// downloader.download_key("https://archive.kali.org/archive-key.asc", &mut dest)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait KeyDownloader {
    /// Download the body of `url` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with an
    /// error status, or the file cannot be written.
    fn download_key(&self, url: &str, dest: &mut File) -> Result<(), DownloadError>;
}

/// Errors arising from key download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed (transport, TLS, timeout, or error status).
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested key was not found (HTTP 404).
    #[error("key not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The server answered successfully but sent no data.
    #[error("empty response from {url}")]
    EmptyBody {
        /// The URL that returned an empty body.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Converts the download failure into the pipeline error for `url`.
    #[must_use]
    pub fn into_integrator_error(self, url: &str) -> IntegratorError {
        match self {
            Self::NotFound { url: missing } => IntegratorError::KeyNotFound { url: missing },
            Self::HttpError { reason, .. } => IntegratorError::KeyDownload {
                url: url.to_owned(),
                reason,
            },
            other @ (Self::EmptyBody { .. } | Self::Io(_)) => IntegratorError::KeyDownload {
                url: url.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

/// HTTP-based downloader using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    /// Creates a downloader, optionally bounding each request by `timeout`.
    ///
    /// Without a timeout the request runs until the transport gives up.
    /// Plain `http` URLs are refused, including redirect targets.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .https_only(true)
            .timeout_global(timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl KeyDownloader for HttpDownloader {
    fn download_key(&self, url: &str, dest: &mut File) -> Result<(), DownloadError> {
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let written = std::io::copy(&mut response.into_body().as_reader(), dest)
            .map_err(|e| DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        log::debug!("downloaded {written} bytes from {url}");
        if written == 0 {
            return Err(DownloadError::EmptyBody {
                url: url.to_owned(),
            });
        }
        Ok(())
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
