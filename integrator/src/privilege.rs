//! Superuser check.
//!
//! Every later step writes under `/etc/apt` or talks to the APT trust store,
//! so the run is refused up front unless the effective UID is 0.

use crate::error::{IntegratorError, Result};

/// Source of the process's effective user identity.
pub trait IdentitySource {
    /// Returns the effective UID of the running process.
    fn effective_uid(&self) -> u32;
}

/// Reads the effective UID from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

impl IdentitySource for SystemIdentity {
    fn effective_uid(&self) -> u32 {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() }
    }
}

/// Fails unless the effective UID is the superuser's.
///
/// # Errors
///
/// Returns [`IntegratorError::PrivilegeRequired`] for any non-zero UID.
///
/// # Examples
///
/// ```
/// use repo_integrator::privilege::{IdentitySource, ensure_superuser};
///
/// struct Uid(u32);
/// impl IdentitySource for Uid {
///     fn effective_uid(&self) -> u32 { self.0 }
/// }
///
/// assert!(ensure_superuser(&Uid(0)).is_ok());
/// assert!(ensure_superuser(&Uid(1000)).is_err());
/// ```
pub fn ensure_superuser(identity: &dyn IdentitySource) -> Result<()> {
    let euid = identity.effective_uid();
    log::debug!("effective UID is {euid}");
    if euid == 0 {
        Ok(())
    } else {
        Err(IntegratorError::PrivilegeRequired { euid })
    }
}
