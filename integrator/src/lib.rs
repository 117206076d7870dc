//! Repository integrator library.
//!
//! This crate configures a Debian host to trust and pull packages from a
//! secondary APT repository (by default the Kali Linux rolling archive) while
//! pinning that repository below the default release. It is used by the
//! `repo-integrator` CLI binary and can be driven programmatically, with every
//! host interaction behind an injectable trait.
//!
//! # Modules
//!
//! - [`backup`] - Timestamped backup of existing APT configuration
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Configuration defaults and TOML loading
//! - [`descriptor`] - Repository descriptor and Source List File rendering
//! - [`download`] - Signing key download over HTTPS
//! - [`error`] - Semantic error types with recovery hints
//! - [`executor`] - External command execution
//! - [`keyring`] - Signing key import into the APT trust store
//! - [`logging`] - Stderr subscriber for diagnostics
//! - [`output`] - Console output helpers and dry-run summary
//! - [`pin`] - Pin Policy File rendering
//! - [`pipeline`] - Ordered integration steps
//! - [`privilege`] - Superuser check
//! - [`refresh`] - Package index refresh

pub mod backup;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod download;
pub mod error;
pub mod executor;
pub mod keyring;
pub mod logging;
pub mod output;
pub mod pin;
pub mod pipeline;
pub mod privilege;
pub mod refresh;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
