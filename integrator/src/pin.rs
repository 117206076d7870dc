//! Pin Policy File rendering.
//!
//! APT selects the candidate version of a package by priority; packages from
//! the default release sit at 500. Pinning the secondary release well below
//! that keeps a plain `upgrade` from ever choosing it, while
//! `apt-get install -t <release> <pkg>` still can.

use crate::error::{IntegratorError, Result};

/// Priority APT assigns to packages from releases that are not pinned.
pub const DEFAULT_INSTALL_PRIORITY: i32 = 500;

/// Priority given to every package of the secondary release.
pub const DEFAULT_PIN_PRIORITY: i32 = 50;

/// A single preferences stanza matching every package of one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinPolicy {
    package: String,
    release: String,
    priority: i32,
}

impl PinPolicy {
    /// Pins all packages (`*`) whose release archive matches `release`.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_integrator::pin::PinPolicy;
    ///
    /// let policy = PinPolicy::for_release("kali-rolling", 50);
    /// assert_eq!(
    ///     policy.render(),
    ///     "Package: *\nPin: release a=kali-rolling\nPin-Priority: 50\n"
    /// );
    /// ```
    #[must_use]
    pub fn for_release(release: &str, priority: i32) -> Self {
        Self {
            package: "*".to_owned(),
            release: release.to_owned(),
            priority,
        }
    }

    /// Returns the release label the stanza matches.
    #[must_use]
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Returns the pin priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns true when packages of this release lose to the default release.
    #[must_use]
    pub const fn is_demoted(&self) -> bool {
        self.priority < DEFAULT_INSTALL_PRIORITY
    }

    /// Renders the stanza in APT preferences syntax.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "Package: {}\nPin: release a={}\nPin-Priority: {}\n",
            self.package, self.release, self.priority
        )
    }
}

/// Checks that a configured priority still demotes the secondary release.
///
/// # Errors
///
/// Returns [`IntegratorError::InvalidConfig`] for priorities at or above
/// [`DEFAULT_INSTALL_PRIORITY`], which would let upgrades pull packages from
/// the secondary release.
pub fn validate_priority(priority: i32) -> Result<()> {
    if priority >= DEFAULT_INSTALL_PRIORITY {
        return Err(IntegratorError::InvalidConfig {
            reason: format!(
                "pin priority {priority} must stay below {DEFAULT_INSTALL_PRIORITY} so upgrades never select the secondary release"
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_stanza_matches_kali_rolling() {
        let policy = PinPolicy::for_release("kali-rolling", DEFAULT_PIN_PRIORITY);
        assert_eq!(
            policy.render(),
            "Package: *\nPin: release a=kali-rolling\nPin-Priority: 50\n"
        );
        assert!(policy.is_demoted());
    }

    #[test]
    fn accessors_report_inputs() {
        let policy = PinPolicy::for_release("sid", -10);
        assert_eq!(policy.release(), "sid");
        assert_eq!(policy.priority(), -10);
    }

    #[rstest]
    #[case::default(50, true)]
    #[case::negative(-1, true)]
    #[case::just_below(499, true)]
    #[case::at_default(500, false)]
    #[case::above(990, false)]
    fn priority_validation(#[case] priority: i32, #[case] accepted: bool) {
        assert_eq!(validate_priority(priority).is_ok(), accepted);
        assert_eq!(PinPolicy::for_release("x", priority).is_demoted(), accepted);
    }
}
