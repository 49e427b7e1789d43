//! Package lifecycle: download, verify, unpack, install and uninstall.
//!
//! Every package variant shares a [`PackageCore`] holding the source
//! description, the target application's directories and the lifecycle
//! state. Variants implement [`InstallablePackage`]; download and verify
//! are common to all of them and provided by the trait.
//!
//! States advance `Pending → Downloaded → Verified → Installed`, and
//! `Installed → Uninstalled`. Operation ordering is the
//! [`CommandSequencer`](crate::sequencer::CommandSequencer)'s job; only
//! `verify` checks its precondition, because verifying a file that was never
//! fetched can only fail confusingly.

mod builder;
mod native;
mod runtime_zip;
mod tarball;

pub use builder::{PackageBuilder, PackageKind};
pub use native::NativeInstallerPackage;
pub use runtime_zip::{RuntimeCommand, RuntimeZipPackage};
pub use tarball::{PostInstall, TarPackage};

use appkeep_common::app_dirs::AppDirs;
use appkeep_common::integrity::{DigestKind, IntegrityChecker};
use appkeep_common::paths::DirKind;
use camino::Utf8PathBuf;
use log::{debug, info, warn};
use std::fmt;

use crate::download::Downloader;
use crate::error::{InstallerError, Result};
use crate::executor::CommandExecutor;
use crate::extraction::{ArchiveExtractor, ArchiveFormat, ExtractionError};
use crate::fs_ops;

/// Lifecycle state of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// Nothing has happened yet.
    Pending,
    /// The artefact is present in the save directory.
    Downloaded,
    /// The artefact matched its expected digest.
    Verified,
    /// The package has been installed.
    Installed,
    /// The package has been removed.
    Uninstalled,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Downloaded => "downloaded",
            Self::Verified => "verified",
            Self::Installed => "installed",
            Self::Uninstalled => "uninstalled",
        };
        f.write_str(label)
    }
}

/// A digest the downloaded artefact must match.
///
/// The hex string is stored verbatim; its length is checked when verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDigest {
    kind: DigestKind,
    hex: String,
}

impl ExpectedDigest {
    /// Pair an algorithm with its expected hex digest.
    #[must_use]
    pub fn new(kind: DigestKind, hex: impl Into<String>) -> Self {
        Self {
            kind,
            hex: hex.into(),
        }
    }

    /// The digest algorithm.
    #[must_use]
    pub const fn kind(&self) -> DigestKind {
        self.kind
    }

    /// The expected hex digest.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

/// Where an artefact comes from and where it is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    /// Application name.
    pub app_name: String,
    /// Artefact file name inside `save_dir`.
    pub file_name: String,
    /// Directory the artefact is downloaded into.
    pub save_dir: Utf8PathBuf,
    /// Digest to verify against, if any.
    pub digest: Option<ExpectedDigest>,
    /// Remote location of the artefact.
    pub url: String,
}

impl PackageSource {
    /// `save_dir / file_name`.
    #[must_use]
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.save_dir.join(&self.file_name)
    }
}

/// Collaborators a package needs to carry out lifecycle operations.
#[derive(Clone, Copy)]
pub struct LifecycleServices<'a> {
    /// Artefact transfer.
    pub downloader: &'a dyn Downloader,
    /// Archive unpacking.
    pub extractor: &'a dyn ArchiveExtractor,
    /// External process execution.
    pub executor: &'a dyn CommandExecutor,
}

impl fmt::Debug for LifecycleServices<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleServices").finish_non_exhaustive()
    }
}

/// State shared by every package variant.
#[derive(Debug)]
pub struct PackageCore {
    source: PackageSource,
    app_dirs: AppDirs,
    state: PackageState,
}

impl PackageCore {
    /// Bind a source to the target application's directories.
    #[must_use]
    pub const fn new(source: PackageSource, app_dirs: AppDirs) -> Self {
        Self {
            source,
            app_dirs,
            state: PackageState::Pending,
        }
    }

    /// The source description.
    #[must_use]
    pub const fn source(&self) -> &PackageSource {
        &self.source
    }

    /// The target application's directories.
    #[must_use]
    pub const fn app_dirs(&self) -> &AppDirs {
        &self.app_dirs
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PackageState {
        self.state
    }

    /// Fetch the artefact unless it is already in the save directory.
    ///
    /// A failed transfer removes whatever was partially written.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] if the save directory cannot be
    /// created and [`InstallerError::Transfer`] if the transfer fails.
    pub fn download(&mut self, downloader: &dyn Downloader) -> Result<()> {
        let path = self.source.archive_path();
        if path.is_file() {
            info!("{path} already present; skipping download");
        } else {
            fs_ops::ensure_dir(&self.source.save_dir)?;
            info!("downloading {} to {path}", self.source.url);
            if let Err(e) = downloader.fetch(&self.source.url, &path) {
                if let Err(cleanup) = fs_ops::remove_file_if_exists(&path) {
                    warn!("could not remove partial download {path}: {cleanup}");
                }
                return Err(InstallerError::Transfer(e));
            }
        }
        if self.state == PackageState::Pending {
            self.state = PackageState::Downloaded;
        }
        Ok(())
    }

    /// Check the downloaded artefact against the expected digest.
    ///
    /// Fails closed: a package without an expected digest never verifies.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidState`] unless the package has been
    /// downloaded and [`InstallerError::Verification`] when the digest is
    /// missing, malformed or different.
    pub fn verify(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            PackageState::Downloaded | PackageState::Verified
        ) {
            return Err(InstallerError::InvalidState {
                operation: "verify",
                state: self.state,
            });
        }
        let expected = self
            .source
            .digest
            .as_ref()
            .ok_or_else(|| self.verification_error("no expected digest configured"))?;
        let checker = IntegrityChecker::from_file(self.source.archive_path());
        checker
            .verify(expected.kind(), expected.hex())
            .map_err(|e| self.verification_error(e))?;
        info!("{} matches its {} digest", self.source.file_name, expected.kind());
        self.state = PackageState::Verified;
        Ok(())
    }

    fn verification_error(&self, reason: impl fmt::Display) -> InstallerError {
        InstallerError::Verification {
            package: self.source.app_name.clone(),
            reason: reason.to_string(),
        }
    }

    /// Extract the artefact into the scratch directory and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Extraction`] when the file name has no
    /// known archive format or extraction fails.
    pub fn unpack_to_scratch(&self, extractor: &dyn ArchiveExtractor) -> Result<Utf8PathBuf> {
        let format = ArchiveFormat::from_file_name(&self.source.file_name).ok_or_else(|| {
            ExtractionError::UnknownFormat {
                file_name: self.source.file_name.clone(),
            }
        })?;
        let scratch = self.app_dirs.temp_dir()?.to_owned();
        let files = extractor.extract(&self.source.archive_path(), &scratch, format)?;
        debug!("extracted {} files into {scratch}", files.len());
        Ok(scratch)
    }

    /// The application's install root.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PathUnsupported`] where the platform has no
    /// opt directory.
    pub fn install_root(&self) -> Result<Utf8PathBuf> {
        self.app_dirs
            .app_root_dir()
            .ok_or(InstallerError::PathUnsupported {
                category: DirKind::Opt,
            })
    }

    pub(crate) fn release_scratch(&mut self) -> Result<()> {
        self.app_dirs.release_temp_dir().map_err(InstallerError::from)
    }

    pub(crate) fn keep_scratch(&mut self) -> Option<Utf8PathBuf> {
        self.app_dirs.keep_temp_dir()
    }

    pub(crate) fn mark(&mut self, state: PackageState) {
        debug!("{}: {} -> {state}", self.source.app_name, self.state);
        self.state = state;
    }

    pub(crate) fn unsupported(
        &self,
        operation: &'static str,
        kind: &'static str,
    ) -> InstallerError {
        debug!("{}: {operation} unsupported for {kind}", self.source.app_name);
        InstallerError::UnsupportedOperation { operation, kind }
    }
}

/// Capability interface implemented by every package variant.
pub trait InstallablePackage {
    /// Shared package state.
    fn core(&self) -> &PackageCore;

    /// Shared package state, mutably.
    fn core_mut(&mut self) -> &mut PackageCore;

    /// Short label for the variant, used in messages.
    fn kind(&self) -> &'static str;

    /// The application name.
    fn name(&self) -> &str {
        &self.core().source().app_name
    }

    /// The current lifecycle state.
    fn state(&self) -> PackageState {
        self.core().state()
    }

    /// Fetch the artefact. See [`PackageCore::download`].
    ///
    /// # Errors
    ///
    /// Propagates transfer and filesystem failures.
    fn download(&mut self, services: &LifecycleServices<'_>) -> Result<()> {
        self.core_mut().download(services.downloader)
    }

    /// Verify the artefact. See [`PackageCore::verify`].
    ///
    /// # Errors
    ///
    /// Propagates state and verification failures.
    fn verify(&mut self) -> Result<()> {
        self.core_mut().verify()
    }

    /// Extract the artefact into scratch space and return the scratch path.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedOperation`] for variants that are
    /// not archives, or the extraction failure.
    fn unpack(&self, services: &LifecycleServices<'_>) -> Result<Utf8PathBuf>;

    /// Install the package.
    ///
    /// # Errors
    ///
    /// Returns the variant-specific failure.
    fn install(&mut self, services: &LifecycleServices<'_>) -> Result<()>;

    /// Remove the installed package.
    ///
    /// # Errors
    ///
    /// Returns the variant-specific failure.
    fn uninstall(&mut self, services: &LifecycleServices<'_>) -> Result<()>;
}

impl fmt::Debug for dyn InstallablePackage + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallablePackage")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Borrowed argument list for [`CommandExecutor::run`].
fn arg_refs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared scaffolding for package tests.

    use super::*;
    use appkeep_common::platform::Platform;
    use tempfile::TempDir;

    /// A sandboxed home directory with Linux user-mode directories.
    pub(crate) struct Home {
        _dir: TempDir,
        pub(crate) root: Utf8PathBuf,
    }

    impl Home {
        pub(crate) fn new() -> Self {
            let dir = tempfile::tempdir().expect("temp home");
            let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 path");
            Self { _dir: dir, root }
        }

        pub(crate) fn app_dirs(&self, name: &str) -> AppDirs {
            AppDirs::builder()
                .app_name(name)
                .platform(Platform::Linux)
                .elevated(false)
                .home(self.root.clone())
                .build()
                .expect("valid app dirs")
        }

        pub(crate) fn save_dir(&self) -> Utf8PathBuf {
            self.root.join("downloads")
        }

        pub(crate) fn source(
            &self,
            file_name: &str,
            digest: Option<ExpectedDigest>,
        ) -> PackageSource {
            PackageSource {
                app_name: "demo".to_owned(),
                file_name: file_name.to_owned(),
                save_dir: self.save_dir(),
                digest,
                url: format!("https://example.test/{file_name}"),
            }
        }

        pub(crate) fn core(&self, file_name: &str, digest: Option<ExpectedDigest>) -> PackageCore {
            PackageCore::new(self.source(file_name, digest), self.app_dirs("demo"))
        }
    }

    pub(crate) fn sha256(data: &[u8]) -> ExpectedDigest {
        let hex = IntegrityChecker::from_bytes(data.to_vec())
            .digest(DigestKind::Sha256)
            .expect("in-memory digest");
        ExpectedDigest::new(DigestKind::Sha256, hex)
    }
}
