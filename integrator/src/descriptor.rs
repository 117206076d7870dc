//! Repository descriptor and Source List File rendering.
//!
//! A [`RepositoryDescriptor`] names the secondary archive: its base URL, the
//! distribution label, and the components to enable. Rendering is pure so the
//! exact file contents can be checked without touching the filesystem; the
//! integrator performs a single write of [`render_source_list`]'s output.

use crate::error::{IntegratorError, Result};
use serde::Deserialize;
use std::fmt;

/// Base URL of the Kali Linux package archive.
pub const DEFAULT_REPOSITORY_URL: &str = "http://http.kali.org/kali";

/// Rolling distribution label of the Kali Linux archive.
pub const DEFAULT_DISTRIBUTION: &str = "kali-rolling";

/// Components enabled by default.
pub const DEFAULT_COMPONENTS: [&str; 3] = ["main", "non-free", "contrib"];

/// Kind of APT source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Binary packages (`deb`).
    Binary,
    /// Source packages (`deb-src`).
    Source,
}

impl EntryKind {
    /// Returns the one-line-style keyword APT uses for this entry kind.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Binary => "deb",
            Self::Source => "deb-src",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Location and selection of the secondary repository.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryDescriptor {
    /// Archive base URL.
    pub url: String,
    /// Distribution (suite) label, also used as the pin release label.
    pub distribution: String,
    /// Ordered component names.
    pub components: Vec<String>,
}

impl Default for RepositoryDescriptor {
    /// Describes the Kali Linux rolling archive.
    fn default() -> Self {
        Self::new(
            DEFAULT_REPOSITORY_URL,
            DEFAULT_DISTRIBUTION,
            DEFAULT_COMPONENTS,
        )
    }
}

impl RepositoryDescriptor {
    /// Creates a descriptor from its parts.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_integrator::descriptor::RepositoryDescriptor;
    ///
    /// let repo = RepositoryDescriptor::new(
    ///     "http://deb.example.org/debian",
    ///     "sid",
    ///     ["main"],
    /// );
    /// assert_eq!(repo.binary_entry(), "deb http://deb.example.org/debian sid main");
    /// ```
    pub fn new<I, S>(url: &str, distribution: &str, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            url: url.to_owned(),
            distribution: distribution.to_owned(),
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the one-line entry for the given kind.
    #[must_use]
    pub fn entry(&self, kind: EntryKind) -> String {
        format!(
            "{kind} {} {} {}",
            self.url,
            self.distribution,
            self.components.join(" ")
        )
    }

    /// Renders the binary-package entry.
    #[must_use]
    pub fn binary_entry(&self) -> String {
        self.entry(EntryKind::Binary)
    }

    /// Renders the source-package entry.
    #[must_use]
    pub fn source_entry(&self) -> String {
        self.entry(EntryKind::Source)
    }

    /// Checks that every field renders to a well-formed one-line entry.
    ///
    /// The one-line format is whitespace separated, so none of the fields may
    /// be empty or contain whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`IntegratorError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        require_token("repository url", &self.url)?;
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(IntegratorError::InvalidConfig {
                reason: format!("repository url {} must use http or https", self.url),
            });
        }
        require_token("repository distribution", &self.distribution)?;
        if self.components.is_empty() {
            return Err(IntegratorError::InvalidConfig {
                reason: "repository components must not be empty".to_owned(),
            });
        }
        for component in &self.components {
            require_token("repository component", component)?;
        }
        Ok(())
    }
}

/// Rejects empty values and values containing whitespace.
pub(crate) fn require_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(IntegratorError::InvalidConfig {
            reason: format!("{field} {value:?} must be a single non-empty word"),
        });
    }
    Ok(())
}

/// Renders the management comment heading the Source List File.
#[must_use]
pub fn management_comment(descriptor: &RepositoryDescriptor) -> String {
    format!(
        "# {} repository, managed by repo-integrator; local edits are overwritten",
        descriptor.distribution
    )
}

/// Renders the complete Source List File.
///
/// The document is exactly three lines: the management comment, the binary
/// entry, and the source entry.
///
/// # Examples
///
/// ```
/// use repo_integrator::descriptor::{RepositoryDescriptor, render_source_list};
///
/// let text = render_source_list(&RepositoryDescriptor::default());
/// let lines: Vec<&str> = text.lines().collect();
/// assert_eq!(lines.len(), 3);
/// assert!(lines[0].starts_with('#'));
/// assert_eq!(lines[1], "deb http://http.kali.org/kali kali-rolling main non-free contrib");
/// ```
#[must_use]
pub fn render_source_list(descriptor: &RepositoryDescriptor) -> String {
    format!(
        "{}\n{}\n{}\n",
        management_comment(descriptor),
        descriptor.binary_entry(),
        descriptor.source_entry()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn kali_defaults_render_expected_document() {
        let text = render_source_list(&RepositoryDescriptor::default());
        let expected = concat!(
            "# kali-rolling repository, managed by repo-integrator; local edits are overwritten\n",
            "deb http://http.kali.org/kali kali-rolling main non-free contrib\n",
            "deb-src http://http.kali.org/kali kali-rolling main non-free contrib\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn rendering_is_deterministic() {
        let repo = RepositoryDescriptor::default();
        assert_eq!(render_source_list(&repo), render_source_list(&repo));
    }

    #[test]
    fn component_order_is_preserved() {
        let repo = RepositoryDescriptor::new("https://deb.example.org", "sid", ["contrib", "main"]);
        assert!(repo.binary_entry().ends_with("sid contrib main"));
    }

    #[rstest]
    #[case::binary(EntryKind::Binary, "deb ")]
    #[case::source(EntryKind::Source, "deb-src ")]
    fn entry_starts_with_keyword(#[case] kind: EntryKind, #[case] prefix: &str) {
        let entry = RepositoryDescriptor::default().entry(kind);
        assert!(entry.starts_with(prefix), "entry: {entry}");
    }

    #[test]
    fn defaults_are_valid() {
        assert!(RepositoryDescriptor::default().validate().is_ok());
    }

    #[rstest]
    #[case::empty_url(RepositoryDescriptor::new("", "kali-rolling", ["main"]))]
    #[case::ftp_url(RepositoryDescriptor::new("ftp://mirror", "kali-rolling", ["main"]))]
    #[case::spaced_distribution(RepositoryDescriptor::new("http://m", "kali rolling", ["main"]))]
    #[case::no_components(RepositoryDescriptor::new("http://m", "kali-rolling", Vec::<String>::new()))]
    #[case::blank_component(RepositoryDescriptor::new("http://m", "kali-rolling", ["main", ""]))]
    fn malformed_descriptors_are_rejected(#[case] repo: RepositoryDescriptor) {
        let err = repo.validate().expect_err("descriptor should be rejected");
        assert!(matches!(err, IntegratorError::InvalidConfig { .. }));
    }
}
