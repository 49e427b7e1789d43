//! Platform installers that are run as downloaded.

use camino::Utf8PathBuf;
use log::info;

use super::{InstallablePackage, LifecycleServices, PackageCore, PackageState};
use crate::error::Result;
use crate::executor::run_checked;
use crate::fs_ops;

/// An executable installer such as a Windows `.exe`.
///
/// Installing runs the downloaded file without arguments. The installer
/// owns the result, so uninstall and unpack are unsupported.
#[derive(Debug)]
pub struct NativeInstallerPackage {
    core: PackageCore,
}

impl NativeInstallerPackage {
    /// Wrap a package core.
    #[must_use]
    pub const fn new(core: PackageCore) -> Self {
        Self { core }
    }
}

impl InstallablePackage for NativeInstallerPackage {
    fn core(&self) -> &PackageCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PackageCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        "native installer"
    }

    fn unpack(&self, _services: &LifecycleServices<'_>) -> Result<Utf8PathBuf> {
        Err(self.core.unsupported("unpack", self.kind()))
    }

    fn install(&mut self, services: &LifecycleServices<'_>) -> Result<()> {
        let installer = self.core.source().archive_path();
        fs_ops::make_executable(&installer)?;
        info!("launching {installer}");
        run_checked(services.executor, installer.as_str(), &[], None)?;
        self.core.mark(PackageState::Installed);
        Ok(())
    }

    fn uninstall(&mut self, _services: &LifecycleServices<'_>) -> Result<()> {
        Err(self.core.unsupported("uninstall", self.kind()))
    }
}
