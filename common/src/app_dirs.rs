//! Per-application directories.
//!
//! Every path is a [`UserDirs`] root joined with the application name, so an
//! [`AppDirs`] holds no independent state. When the platform has no root for
//! a category the accessor returns `None`.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::collections::BTreeMap;

use crate::error::{DirsError, Result};
use crate::json_file::JsonFile;
use crate::paths::{DEFAULT_ICON_RESOLUTION, DirectoryResolver};
use crate::platform::{Platform, PrivilegeMode};
use crate::user_dirs::{UserDirs, UserDirsBuilder};

/// Suffix of freedesktop launcher files.
pub const DESKTOP_ENTRY_SUFFIX: &str = ".desktop";

/// Directories derived for one application.
#[derive(Debug)]
pub struct AppDirs {
    name: String,
    author: Option<String>,
    user_dirs: UserDirs,
    overrides: UserDirsBuilder,
}

impl AppDirs {
    /// Start building an [`AppDirs`].
    #[must_use]
    pub fn builder() -> AppDirsBuilder {
        AppDirsBuilder::default()
    }

    /// The application name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The optional author recorded at construction.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// The underlying user directories.
    #[must_use]
    pub const fn user_dirs(&self) -> &UserDirs {
        &self.user_dirs
    }

    /// The effective privilege mode.
    #[must_use]
    pub const fn mode(&self) -> PrivilegeMode {
        self.user_dirs.mode()
    }

    /// Build a fresh instance for a different privilege mode.
    ///
    /// The underlying [`UserDirs`] is rebuilt from scratch so that no path
    /// computed under the previous mode survives.
    ///
    /// # Errors
    ///
    /// Returns [`DirsError`] if the home directory cannot be resolved.
    pub fn with_privilege_mode(&self, mode: PrivilegeMode) -> Result<Self> {
        let user_dirs = self.overrides.clone().privilege_mode(mode).build()?;
        Ok(Self {
            name: self.name.clone(),
            author: self.author.clone(),
            user_dirs,
            overrides: self.overrides.clone().privilege_mode(mode),
        })
    }

    fn join_name(&self, root: Option<Utf8PathBuf>) -> Option<Utf8PathBuf> {
        root.map(|root| root.join(&self.name))
    }

    /// `<cache>/<name>`.
    #[must_use]
    pub fn app_cache_dir(&self) -> Option<Utf8PathBuf> {
        self.join_name(self.user_dirs.cache_dir())
    }

    /// `<config>/<name>`.
    #[must_use]
    pub fn app_config_dir(&self) -> Option<Utf8PathBuf> {
        self.join_name(self.user_dirs.config_dir())
    }

    /// `<opt>/<name>`, the install root for self-contained trees.
    #[must_use]
    pub fn app_root_dir(&self) -> Option<Utf8PathBuf> {
        self.join_name(self.user_dirs.opt_dir())
    }

    /// `<binary>/<name>`, the launcher script location.
    #[must_use]
    pub fn app_script_path(&self) -> Option<Utf8PathBuf> {
        self.join_name(self.user_dirs.binary_dir())
    }

    /// Where an icon file belongs in the default-resolution icon theme.
    #[must_use]
    pub fn app_icon_path(&self, icon_file: &str) -> Option<Utf8PathBuf> {
        self.user_dirs
            .icon_dir(DEFAULT_ICON_RESOLUTION)
            .map(|dir| dir.join(icon_file))
    }

    /// Where a desktop entry belongs. `.desktop` is appended when missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use appkeep_common::app_dirs::AppDirs;
    /// use appkeep_common::platform::Platform;
    ///
    /// let app = AppDirs::builder()
    ///     .app_name("torbrowser")
    ///     .platform(Platform::Linux)
    ///     .elevated(false)
    ///     .home("/home/ana")
    ///     .build()
    ///     .expect("valid");
    /// let plain = app.app_desktop_entry_path("tor").expect("linux has entries");
    /// let suffixed = app.app_desktop_entry_path("tor.desktop").expect("linux has entries");
    /// assert_eq!(plain, suffixed);
    /// assert!(plain.as_str().ends_with("applications/tor.desktop"));
    /// ```
    #[must_use]
    pub fn app_desktop_entry_path(&self, entry_name: &str) -> Option<Utf8PathBuf> {
        let file_name = if entry_name.ends_with(DESKTOP_ENTRY_SUFFIX) {
            entry_name.to_owned()
        } else {
            format!("{entry_name}{DESKTOP_ENTRY_SUFFIX}")
        };
        self.user_dirs
            .desktop_entry_dir()
            .map(|dir| dir.join(file_name))
    }

    /// `<config>/<name>/<name>.conf`.
    #[must_use]
    pub fn app_conf_file(&self) -> Option<Utf8PathBuf> {
        self.app_config_dir()
            .map(|dir| dir.join(format!("{}.conf", self.name)))
    }

    /// Handle to `<config>/<name>/<file_name>`.
    #[must_use]
    pub fn app_json_config(&self, file_name: &str) -> Option<JsonFile> {
        self.app_config_dir()
            .map(|dir| JsonFile::new(dir.join(file_name)))
    }

    /// Handle to `<config>/<name>/<name>.json`.
    #[must_use]
    pub fn default_json_config(&self) -> Option<JsonFile> {
        self.app_json_config(&format!("{}.json", self.name))
    }

    /// The install root, cache and config directories keyed by label.
    ///
    /// Absent directories are omitted.
    #[must_use]
    pub fn dirs_summary(&self) -> BTreeMap<&'static str, Utf8PathBuf> {
        [
            ("APP_DIR", self.app_root_dir()),
            ("APP_DIR_CACHE", self.app_cache_dir()),
            ("APP_DIR_CONFIG", self.app_config_dir()),
        ]
        .into_iter()
        .filter_map(|(label, path)| path.map(|p| (label, p)))
        .collect()
    }

    /// Create the cache and config directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the first directory that cannot be created.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [self.app_cache_dir(), self.app_config_dir()]
            .into_iter()
            .flatten()
        {
            debug!("ensuring {dir}");
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// The scratch directory of the underlying [`UserDirs`].
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::Scratch`] if allocation fails.
    pub fn temp_dir(&self) -> Result<&Utf8Path> {
        self.user_dirs.temp_dir()
    }

    /// The scratch file of the underlying [`UserDirs`].
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::Scratch`] if allocation fails.
    pub fn temp_file(&self) -> Result<&Utf8Path> {
        self.user_dirs.temp_file()
    }

    /// Remove the scratch directory now.
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::Scratch`] if removal fails.
    pub fn release_temp_dir(&mut self) -> Result<()> {
        self.user_dirs.release_temp_dir()
    }

    /// Keep the scratch directory on disk after this instance is dropped.
    pub fn keep_temp_dir(&mut self) -> Option<Utf8PathBuf> {
        self.user_dirs.keep_temp_dir()
    }
}

/// Builder for [`AppDirs`].
///
/// The application name is required; everything else has a default.
#[derive(Debug, Clone, Default)]
pub struct AppDirsBuilder {
    name: Option<String>,
    author: Option<String>,
    user_dirs: UserDirsBuilder,
}

impl AppDirsBuilder {
    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record an author.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Request a privilege mode.
    #[must_use]
    pub fn privilege_mode(mut self, mode: PrivilegeMode) -> Self {
        self.user_dirs = self.user_dirs.privilege_mode(mode);
        self
    }

    /// Override the detected platform.
    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.user_dirs = self.user_dirs.platform(platform);
        self
    }

    /// Override the detected process elevation.
    #[must_use]
    pub fn elevated(mut self, elevated: bool) -> Self {
        self.user_dirs = self.user_dirs.elevated(elevated);
        self
    }

    /// Override the detected home directory.
    #[must_use]
    pub fn home(mut self, home: impl Into<Utf8PathBuf>) -> Self {
        self.user_dirs = self.user_dirs.home(home);
        self
    }

    /// Build the directories.
    ///
    /// # Errors
    ///
    /// Returns [`DirsError::MissingAppName`] when no non-blank name was set,
    /// before any other work, and otherwise propagates [`UserDirsBuilder`]
    /// failures.
    pub fn build(self) -> Result<AppDirs> {
        let name = self
            .name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .ok_or(DirsError::MissingAppName)?;
        let user_dirs = self.user_dirs.clone().build()?;
        Ok(AppDirs {
            name,
            author: self.author,
            user_dirs,
            overrides: self.user_dirs,
        })
    }
}
