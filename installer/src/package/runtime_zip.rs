//! Archives installed by running them under an external runtime.

use camino::Utf8PathBuf;
use log::{info, warn};

use super::{InstallablePackage, LifecycleServices, PackageCore, PackageState, arg_refs};
use crate::error::Result;
use crate::executor::run_checked;

/// The runtime invocation that performs the installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCommand {
    /// Runtime executable, looked up on `PATH`.
    pub runtime: String,
    /// Arguments passed to the runtime.
    pub args: Vec<String>,
    /// Working directory relative to the unpacked archive.
    pub workdir: String,
}

/// A zip archive containing an installer script for some runtime.
///
/// The archive is unpacked into scratch space and the runtime is started in
/// `scratch / workdir`. Scratch space is released after a successful run and
/// kept on failure so the unpacked files can be inspected.
#[derive(Debug)]
pub struct RuntimeZipPackage {
    core: PackageCore,
    command: RuntimeCommand,
}

impl RuntimeZipPackage {
    /// Create a package that installs by running `command`.
    #[must_use]
    pub const fn new(core: PackageCore, command: RuntimeCommand) -> Self {
        Self { core, command }
    }
}

impl InstallablePackage for RuntimeZipPackage {
    fn core(&self) -> &PackageCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PackageCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        "runtime zip"
    }

    fn unpack(&self, services: &LifecycleServices<'_>) -> Result<Utf8PathBuf> {
        self.core.unpack_to_scratch(services.extractor)
    }

    fn install(&mut self, services: &LifecycleServices<'_>) -> Result<()> {
        let outcome = self.unpack(services).and_then(|scratch| {
            let workdir = scratch.join(&self.command.workdir);
            info!("running {} in {workdir}", self.command.runtime);
            run_checked(
                services.executor,
                &self.command.runtime,
                &arg_refs(&self.command.args),
                Some(&workdir),
            )
        });
        if let Err(e) = outcome {
            if let Some(kept) = self.core.keep_scratch() {
                warn!("installer files left in {kept}");
            }
            return Err(e);
        }
        self.core.release_scratch()?;
        self.core.mark(PackageState::Installed);
        Ok(())
    }

    fn uninstall(&mut self, _services: &LifecycleServices<'_>) -> Result<()> {
        Err(self.core.unsupported("uninstall", self.kind()))
    }
}
