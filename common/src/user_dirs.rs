//! Application-independent user directories and scratch allocation.
//!
//! [`UserDirs`] is built once through [`UserDirsBuilder`], which settles the
//! effective privilege mode and picks the platform resolver. The instance
//! then answers directory queries and hands out a scratch directory and a
//! scratch file, each created on first use and reused afterwards.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use once_cell::unsync::OnceCell;
use std::fmt;
use tempfile::{NamedTempFile, TempDir, TempPath};

use crate::error::{DirsError, Result};
use crate::paths::{DirKind, DirectoryResolver, resolver_for};
use crate::platform::{Platform, PrivilegeMode, effective_mode, is_elevated};

/// Global directories for the invoking user or the whole system.
pub struct UserDirs {
    mode: PrivilegeMode,
    platform: Platform,
    resolver: Box<dyn DirectoryResolver>,
    scratch_dir: OnceCell<ScratchDir>,
    scratch_file: OnceCell<ScratchFile>,
}

struct ScratchDir {
    guard: TempDir,
    path: Utf8PathBuf,
}

struct ScratchFile {
    _guard: TempPath,
    path: Utf8PathBuf,
}

impl UserDirs {
    /// Start building a [`UserDirs`] for the current platform.
    #[must_use]
    pub fn builder() -> UserDirsBuilder {
        UserDirsBuilder::default()
    }

    /// Wrap an explicit resolver.
    ///
    /// The builder is the usual entry point; this constructor exists for
    /// callers that already hold a resolver, such as tests.
    #[must_use]
    pub fn with_resolver(
        resolver: Box<dyn DirectoryResolver>,
        mode: PrivilegeMode,
        platform: Platform,
    ) -> Self {
        Self {
            mode,
            platform,
            resolver,
            scratch_dir: OnceCell::new(),
            scratch_file: OnceCell::new(),
        }
    }

    /// The effective privilege mode.
    #[must_use]
    pub const fn mode(&self) -> PrivilegeMode {
        self.mode
    }

    /// The platform the resolver was selected for.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Return the scratch directory, creating it on first call.
    ///
    /// Later calls return the same path for the lifetime of this instance.
    /// The directory is removed when the instance is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::Scratch`] if the directory cannot be created.
    pub fn temp_dir(&self) -> Result<&Utf8Path> {
        let scratch = self.scratch_dir.get_or_try_init(|| {
            let guard = TempDir::new().map_err(|source| DirsError::Scratch { source })?;
            let path = utf8_scratch(guard.path())?;
            debug!("allocated scratch directory {path}");
            Ok::<_, DirsError>(ScratchDir { guard, path })
        })?;
        Ok(&scratch.path)
    }

    /// Return the scratch file path, creating the file on first call.
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::Scratch`] if the file cannot be created.
    pub fn temp_file(&self) -> Result<&Utf8Path> {
        let scratch = self.scratch_file.get_or_try_init(|| {
            let guard = NamedTempFile::new()
                .map_err(|source| DirsError::Scratch { source })?
                .into_temp_path();
            let path = utf8_scratch(&guard)?;
            debug!("allocated scratch file {path}");
            Ok::<_, DirsError>(ScratchFile {
                _guard: guard,
                path,
            })
        })?;
        Ok(&scratch.path)
    }

    /// Delete the scratch directory now instead of at drop.
    ///
    /// A later [`temp_dir`](Self::temp_dir) call allocates a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::Scratch`] if removal fails.
    pub fn release_temp_dir(&mut self) -> Result<()> {
        match self.scratch_dir.take() {
            Some(scratch) => {
                debug!("removing scratch directory {}", scratch.path);
                scratch
                    .guard
                    .close()
                    .map_err(|source| DirsError::Scratch { source })
            }
            None => Ok(()),
        }
    }

    /// Detach the scratch directory so it survives this instance.
    ///
    /// Returns the kept path, or `None` if no directory was allocated.
    pub fn keep_temp_dir(&mut self) -> Option<Utf8PathBuf> {
        let scratch = self.scratch_dir.take()?;
        let _ = scratch.guard.keep();
        debug!("keeping scratch directory {}", scratch.path);
        Some(scratch.path)
    }
}

impl DirectoryResolver for UserDirs {
    fn resolve(&self, kind: DirKind) -> Option<Utf8PathBuf> {
        self.resolver.resolve(kind)
    }
}

impl fmt::Debug for UserDirs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDirs")
            .field("mode", &self.mode)
            .field("platform", &self.platform)
            .field("scratch_dir", &self.scratch_dir.get().map(|s| &s.path))
            .field("scratch_file", &self.scratch_file.get().map(|s| &s.path))
            .finish_non_exhaustive()
    }
}

fn utf8_scratch(path: &std::path::Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|path| DirsError::NonUtf8Scratch { path })
}

/// Builder for [`UserDirs`].
///
/// Platform, elevation and home directory default to what the running
/// process observes; each can be overridden.
///
/// # Examples
///
/// ```
/// use appkeep_common::paths::DirectoryResolver;
/// use appkeep_common::platform::{Platform, PrivilegeMode};
/// use appkeep_common::user_dirs::UserDirs;
/// use camino::Utf8PathBuf;
///
/// let dirs = UserDirs::builder()
///     .privilege_mode(PrivilegeMode::User)
///     .platform(Platform::Linux)
///     .elevated(false)
///     .home("/home/ana")
///     .build()
///     .expect("explicit home");
/// assert_eq!(dirs.config_dir(), Some(Utf8PathBuf::from("/home/ana/.config")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct UserDirsBuilder {
    requested: PrivilegeMode,
    platform: Option<Platform>,
    elevated: Option<bool>,
    home: Option<Utf8PathBuf>,
}

impl UserDirsBuilder {
    /// Request a privilege mode. The effective mode may differ.
    #[must_use]
    pub const fn privilege_mode(mut self, mode: PrivilegeMode) -> Self {
        self.requested = mode;
        self
    }

    /// Override the detected platform.
    #[must_use]
    pub const fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Override the detected process elevation.
    #[must_use]
    pub const fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = Some(elevated);
        self
    }

    /// Override the detected home directory.
    #[must_use]
    pub fn home(mut self, home: impl Into<Utf8PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// The mode [`build`](Self::build) will use.
    #[must_use]
    pub fn resolved_mode(&self) -> PrivilegeMode {
        let platform = self.platform.unwrap_or_else(Platform::current);
        let elevated = self.elevated.unwrap_or_else(is_elevated);
        effective_mode(self.requested, platform, elevated)
    }

    /// Build the directories.
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::HomeUnavailable`] or [`DirsError::NonUtf8Home`]
    /// when no home directory was supplied and none can be detected.
    pub fn build(self) -> Result<UserDirs> {
        let mode = self.resolved_mode();
        let platform = self.platform.unwrap_or_else(Platform::current);
        let home = match self.home {
            Some(home) => home,
            None => detect_home()?,
        };
        debug!("resolving {mode} directories for {platform} under {home}");
        Ok(UserDirs::with_resolver(
            resolver_for(platform, mode, home),
            mode,
            platform,
        ))
    }
}

/// Detect the invoking user's home directory.
///
/// # Errors
///
/// Returns [`DirsError::HomeUnavailable`] when the platform reports no home
/// directory and [`DirsError::NonUtf8Home`] when it is not UTF-8.
pub fn detect_home() -> Result<Utf8PathBuf> {
    let base = directories_next::BaseDirs::new().ok_or(DirsError::HomeUnavailable)?;
    Utf8PathBuf::from_path_buf(base.home_dir().to_path_buf())
        .map_err(|path| DirsError::NonUtf8Home { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::MockDirectoryResolver;
    use rstest::{fixture, rstest};

    #[fixture]
    fn linux_user() -> UserDirs {
        UserDirs::builder()
            .platform(Platform::Linux)
            .elevated(false)
            .home("/home/ana")
            .build()
            .expect("explicit home")
    }

    #[rstest]
    fn temp_dir_is_memoized(linux_user: UserDirs) {
        let first = linux_user.temp_dir().expect("scratch dir").to_owned();
        let second = linux_user.temp_dir().expect("scratch dir").to_owned();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[rstest]
    fn temp_file_is_memoized(linux_user: UserDirs) {
        let first = linux_user.temp_file().expect("scratch file").to_owned();
        let second = linux_user.temp_file().expect("scratch file").to_owned();
        assert_eq!(first, second);
        assert!(first.is_file());
    }

    #[rstest]
    fn separate_instances_get_distinct_scratch(linux_user: UserDirs) {
        let other = UserDirs::builder()
            .platform(Platform::Linux)
            .elevated(false)
            .home("/home/ana")
            .build()
            .expect("explicit home");
        let a = linux_user.temp_dir().expect("scratch dir");
        let b = other.temp_dir().expect("scratch dir");
        assert_ne!(a, b);
    }

    #[rstest]
    fn release_removes_scratch_dir(mut linux_user: UserDirs) {
        let path = linux_user.temp_dir().expect("scratch dir").to_owned();
        linux_user.release_temp_dir().expect("release");
        assert!(!path.exists());
        let fresh = linux_user.temp_dir().expect("fresh scratch dir").to_owned();
        assert_ne!(fresh, path);
    }

    #[rstest]
    fn release_without_allocation_is_noop(mut linux_user: UserDirs) {
        assert!(linux_user.release_temp_dir().is_ok());
    }

    #[rstest]
    fn kept_scratch_dir_outlives_instance(mut linux_user: UserDirs) {
        assert_eq!(linux_user.keep_temp_dir(), None);
        let path = linux_user.temp_dir().expect("scratch dir").to_owned();
        assert_eq!(linux_user.keep_temp_dir().as_ref(), Some(&path));
        drop(linux_user);
        assert!(path.is_dir());
        std::fs::remove_dir_all(&path).expect("cleanup");
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let dirs = UserDirs::with_resolver(
            Box::new(MockDirectoryResolver::new()),
            PrivilegeMode::User,
            Platform::Linux,
        );
        let path = dirs.temp_dir().expect("scratch dir").to_owned();
        drop(dirs);
        assert!(!path.exists());
    }

    #[test]
    fn elevated_build_forces_system_mode() {
        let dirs = UserDirs::builder()
            .privilege_mode(PrivilegeMode::User)
            .platform(Platform::Linux)
            .elevated(true)
            .home("/home/ana")
            .build()
            .expect("explicit home");
        assert_eq!(dirs.mode(), PrivilegeMode::System);
        assert_eq!(dirs.config_dir(), Some(Utf8PathBuf::from("/etc")));
    }

    #[test]
    fn windows_build_ignores_system_request() {
        let dirs = UserDirs::builder()
            .privilege_mode(PrivilegeMode::System)
            .platform(Platform::Windows)
            .home("C:/Users/ana")
            .build()
            .expect("explicit home");
        assert_eq!(dirs.mode(), PrivilegeMode::User);
        assert_eq!(dirs.opt_dir(), None);
        assert_eq!(
            dirs.cache_dir(),
            Some(Utf8PathBuf::from("C:/Users/ana/AppData/Local"))
        );
    }

    #[test]
    fn resolution_delegates_to_resolver() {
        let mut resolver = MockDirectoryResolver::new();
        resolver
            .expect_resolve()
            .withf(|kind| *kind == DirKind::Themes)
            .returning(|_| Some(Utf8PathBuf::from("/themes")));
        let dirs =
            UserDirs::with_resolver(Box::new(resolver), PrivilegeMode::User, Platform::Linux);
        assert_eq!(dirs.themes_dir(), Some(Utf8PathBuf::from("/themes")));
    }

    #[cfg(unix)]
    #[test]
    fn detect_home_follows_home_variable() {
        temp_env::with_var("HOME", Some("/srv/fixture-home"), || {
            let home = detect_home().expect("home from environment");
            assert_eq!(home, Utf8PathBuf::from("/srv/fixture-home"));
        });
    }
}
