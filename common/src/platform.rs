//! Host platform detection and privilege-mode policy.
//!
//! Directory resolution depends on two inputs: which platform family the
//! process runs on and whether it targets per-user or system-wide locations.
//! This module owns both, together with the rule that reconciles a caller's
//! requested mode with the privilege the process actually holds.

use std::fmt;

/// Platform families with distinct directory conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux with XDG-style per-user directories and FHS system paths.
    Linux,
    /// Windows with roaming and local application data folders.
    Windows,
    /// Any other target. No directory conventions are assigned.
    Other,
}

impl Platform {
    /// Detect the platform the crate was compiled for.
    ///
    /// # Examples
    ///
    /// ```
    /// use appkeep_common::platform::Platform;
    ///
    /// let platform = Platform::current();
    /// if cfg!(target_os = "linux") {
    ///     assert_eq!(platform, Platform::Linux);
    /// }
    /// ```
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }

    /// Return true when the platform follows POSIX user/privilege semantics.
    #[must_use]
    pub const fn is_posix(self) -> bool {
        !matches!(self, Self::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Whether directories target the invoking user or the whole system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PrivilegeMode {
    /// Per-user locations under the home directory.
    #[default]
    User,
    /// Shared system-wide locations such as `/etc` and `/opt`.
    System,
}

impl fmt::Display for PrivilegeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Reconcile a requested privilege mode with the platform and the
/// privilege held by the process.
///
/// Windows has no system mode, so the request is ignored there. On POSIX
/// platforms an elevated process always resolves system locations.
///
/// # Examples
///
/// ```
/// use appkeep_common::platform::{Platform, PrivilegeMode, effective_mode};
///
/// assert_eq!(
///     effective_mode(PrivilegeMode::User, Platform::Linux, true),
///     PrivilegeMode::System,
/// );
/// assert_eq!(
///     effective_mode(PrivilegeMode::System, Platform::Windows, true),
///     PrivilegeMode::User,
/// );
/// ```
#[must_use]
pub const fn effective_mode(
    requested: PrivilegeMode,
    platform: Platform,
    elevated: bool,
) -> PrivilegeMode {
    if !platform.is_posix() {
        return PrivilegeMode::User;
    }
    if elevated {
        return PrivilegeMode::System;
    }
    requested
}

/// Return true when the current process runs with superuser privilege.
#[cfg(unix)]
#[must_use]
pub fn is_elevated() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Return true when the current process runs with superuser privilege.
#[cfg(not(unix))]
#[must_use]
pub fn is_elevated() -> bool {
    false
}
