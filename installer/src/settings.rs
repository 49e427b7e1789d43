//! Persistent appkeep settings.
//!
//! Settings live in appkeep's own JSON config file,
//! `<config>/appkeep/appkeep.json`. The only key today is `save_dir`, the
//! default download directory for every package.

use appkeep_common::app_dirs::AppDirs;
use appkeep_common::json_file::JsonFile;
use appkeep_common::paths::DirKind;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use crate::error::{InstallerError, Result};

/// Application name under which appkeep stores its own files.
pub const APP_NAME: &str = "appkeep";

const SAVE_DIR_KEY: &str = "save_dir";

/// Handle to the settings file.
#[derive(Debug, Clone)]
pub struct Settings {
    file: Option<JsonFile>,
}

impl Settings {
    /// Settings stored in the config directory of `dirs`.
    ///
    /// Platforms without a config directory get an empty, read-only
    /// settings handle.
    #[must_use]
    pub fn for_dirs(dirs: &AppDirs) -> Self {
        Self {
            file: dirs.default_json_config(),
        }
    }

    /// Path of the settings file, if the platform has one.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.file.as_ref().map(JsonFile::path)
    }

    /// The configured download directory.
    ///
    /// Non-string and blank values are ignored.
    #[must_use]
    pub fn save_dir(&self) -> Option<Utf8PathBuf> {
        let value = self.file.as_ref()?.get(SAVE_DIR_KEY)?;
        match value.as_str().map(str::trim) {
            Some(dir) if !dir.is_empty() => Some(Utf8PathBuf::from(dir)),
            _ => {
                debug!("ignoring unusable {SAVE_DIR_KEY} setting: {value}");
                None
            }
        }
    }

    /// Persist `dir` as the download directory.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PathUnsupported`] when there is no config
    /// directory and [`InstallerError::Settings`] when the write fails.
    pub fn set_save_dir(&self, dir: &Utf8Path) -> Result<()> {
        let file = self.file.as_ref().ok_or(InstallerError::PathUnsupported {
            category: DirKind::Config,
        })?;
        file.update_key(SAVE_DIR_KEY, dir.as_str())?;
        debug!("{}: {SAVE_DIR_KEY} = {dir}", file.path());
        Ok(())
    }
}
