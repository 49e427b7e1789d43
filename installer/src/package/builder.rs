//! Assembly of packages from their parts.

use appkeep_common::app_dirs::AppDirs;
use appkeep_common::integrity::DigestKind;
use appkeep_common::paths::DirKind;
use camino::Utf8PathBuf;

use super::{
    ExpectedDigest, InstallablePackage, NativeInstallerPackage, PackageCore, PackageSource,
    PostInstall, RuntimeCommand, RuntimeZipPackage, TarPackage,
};
use crate::error::{InstallerError, Result};

/// Which package variant to build, with its variant-specific settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageKind {
    /// An archive whose `root` directory becomes the install root.
    Tar {
        /// Top-level directory inside the archive.
        root: String,
        /// Optional command run inside the install root.
        post_install: Option<PostInstall>,
    },
    /// An executable installer run as downloaded.
    NativeInstaller,
    /// A zip archive installed by running a runtime command.
    RuntimeZip(RuntimeCommand),
}

/// Builder for boxed [`InstallablePackage`] values.
///
/// # Examples
///
/// ```
/// use appkeep_common::app_dirs::AppDirs;
/// use appkeep_common::integrity::DigestKind;
/// use appkeep_common::platform::Platform;
/// use appkeep_installer::package::{InstallablePackage, PackageBuilder, PackageKind, PackageState};
///
/// let dirs = AppDirs::builder()
///     .app_name("demo")
///     .platform(Platform::Linux)
///     .elevated(false)
///     .home("/home/ana")
///     .build()
///     .expect("valid dirs");
/// let package = PackageBuilder::default()
///     .app_dirs(dirs)
///     .url("https://example.test/demo.exe")
///     .file_name("demo.exe")
///     .digest(DigestKind::Sha256, "00")
///     .kind(PackageKind::NativeInstaller)
///     .build()
///     .expect("complete package");
/// assert_eq!(package.state(), PackageState::Pending);
/// ```
#[derive(Debug, Default)]
pub struct PackageBuilder {
    app_dirs: Option<AppDirs>,
    file_name: Option<String>,
    save_dir: Option<Utf8PathBuf>,
    url: Option<String>,
    digest: Option<ExpectedDigest>,
    kind: Option<PackageKind>,
}

impl PackageBuilder {
    /// Directories of the application being installed.
    #[must_use]
    pub fn app_dirs(mut self, app_dirs: AppDirs) -> Self {
        self.app_dirs = Some(app_dirs);
        self
    }

    /// Name of the downloaded file.
    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Download directory. Defaults to the application's cache directory.
    #[must_use]
    pub fn save_dir(mut self, save_dir: impl Into<Utf8PathBuf>) -> Self {
        self.save_dir = Some(save_dir.into());
        self
    }

    /// Remote location of the artefact.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Expected digest of the artefact.
    #[must_use]
    pub fn digest(mut self, kind: DigestKind, hex: impl Into<String>) -> Self {
        self.digest = Some(ExpectedDigest::new(kind, hex));
        self
    }

    /// Package variant. Defaults to [`PackageKind::NativeInstaller`].
    #[must_use]
    pub fn kind(mut self, kind: PackageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Build the package in the `Pending` state.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Configuration`] when the application
    /// directories, URL or file name are missing, and
    /// [`InstallerError::PathUnsupported`] when no save directory was given
    /// and the platform has no cache directory.
    pub fn build(self) -> Result<Box<dyn InstallablePackage>> {
        let app_dirs = self.app_dirs.ok_or_else(|| missing("application directories"))?;
        let url = non_blank(self.url).ok_or_else(|| missing("url"))?;
        let file_name = non_blank(self.file_name).ok_or_else(|| missing("file name"))?;
        let save_dir = match self.save_dir {
            Some(dir) => dir,
            None => app_dirs
                .app_cache_dir()
                .ok_or(InstallerError::PathUnsupported {
                    category: DirKind::Cache,
                })?,
        };

        let source = PackageSource {
            app_name: app_dirs.name().to_owned(),
            file_name,
            save_dir,
            digest: self.digest,
            url,
        };
        let core = PackageCore::new(source, app_dirs);
        Ok(match self.kind.unwrap_or(PackageKind::NativeInstaller) {
            PackageKind::Tar { root, post_install } => {
                Box::new(TarPackage::new(core, root, post_install))
            }
            PackageKind::NativeInstaller => Box::new(NativeInstallerPackage::new(core)),
            PackageKind::RuntimeZip(command) => Box::new(RuntimeZipPackage::new(core, command)),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(what: &str) -> InstallerError {
    InstallerError::Configuration {
        reason: format!("package {what} not set"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageState;
    use crate::package::fixtures::Home;
    use appkeep_common::platform::Platform;
    use rstest::rstest;

    fn complete(home: &Home) -> PackageBuilder {
        PackageBuilder::default()
            .app_dirs(home.app_dirs("demo"))
            .url("https://example.test/demo.tar.xz")
            .file_name("demo.tar.xz")
    }

    #[rstest]
    #[case::url(|b: PackageBuilder| b.url(" "), "url")]
    #[case::file_name(|b: PackageBuilder| b.file_name(""), "file name")]
    fn blank_required_fields_are_configuration_errors(
        #[case] blank: fn(PackageBuilder) -> PackageBuilder,
        #[case] what: &str,
    ) {
        let home = Home::new();
        let err = blank(complete(&home)).build().expect_err("blank");
        match err {
            InstallerError::Configuration { reason } => assert!(reason.contains(what)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_app_dirs_is_configuration_error() {
        let err = PackageBuilder::default()
            .url("https://example.test/a.zip")
            .file_name("a.zip")
            .build()
            .expect_err("no dirs");
        assert!(matches!(err, InstallerError::Configuration { .. }));
    }

    #[test]
    fn save_dir_defaults_to_cache_dir() {
        let home = Home::new();
        let package = complete(&home)
            .kind(PackageKind::Tar {
                root: "demo".to_owned(),
                post_install: None,
            })
            .build()
            .expect("build");
        assert_eq!(package.kind(), "tar");
        assert_eq!(package.state(), PackageState::Pending);
        assert_eq!(
            package.core().source().save_dir,
            home.root.join(".cache/demo")
        );
    }

    #[test]
    fn explicit_save_dir_and_digest_are_kept() {
        let home = Home::new();
        let package = complete(&home)
            .save_dir(home.save_dir())
            .digest(DigestKind::Sha512, "ab")
            .kind(PackageKind::RuntimeZip(RuntimeCommand {
                runtime: "python3".to_owned(),
                args: Vec::new(),
                workdir: ".".to_owned(),
            }))
            .build()
            .expect("build");
        let source = package.core().source();
        assert_eq!(source.save_dir, home.save_dir());
        assert_eq!(
            source.digest,
            Some(ExpectedDigest::new(DigestKind::Sha512, "ab"))
        );
        assert_eq!(package.kind(), "runtime zip");
    }

    #[test]
    fn platform_without_cache_dir_needs_explicit_save_dir() {
        let dirs = AppDirs::builder()
            .app_name("demo")
            .platform(Platform::Other)
            .home("/home/ana")
            .build()
            .expect("dirs");
        let err = PackageBuilder::default()
            .app_dirs(dirs)
            .url("https://example.test/demo.exe")
            .file_name("demo.exe")
            .build()
            .expect_err("no cache dir");
        assert!(matches!(
            err,
            InstallerError::PathUnsupported {
                category: DirKind::Cache
            }
        ));
    }
}
