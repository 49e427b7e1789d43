//! Self-contained archives installed under the application's opt directory.

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use std::fs;

use super::{InstallablePackage, LifecycleServices, PackageCore, PackageState, arg_refs};
use crate::error::{InstallerError, Result};
use crate::executor::run_checked;
use crate::extraction::ExtractionError;
use crate::fs_ops;

/// A command run inside the install root after copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInstall {
    /// Program path relative to the install root.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

/// An archive whose top-level directory becomes the install root.
#[derive(Debug)]
pub struct TarPackage {
    core: PackageCore,
    root_subdir: String,
    post_install: Option<PostInstall>,
}

impl TarPackage {
    /// Create a package that installs `root_subdir` from the archive.
    #[must_use]
    pub const fn new(
        core: PackageCore,
        root_subdir: String,
        post_install: Option<PostInstall>,
    ) -> Self {
        Self {
            core,
            root_subdir,
            post_install,
        }
    }

    fn run_post_install(&self, root: &Utf8Path, services: &LifecycleServices<'_>) -> Result<()> {
        let Some(hook) = &self.post_install else {
            return Ok(());
        };
        let program = root.join(&hook.program);
        fs_ops::make_executable(&program)?;
        info!("running post-install {program}");
        run_checked(
            services.executor,
            program.as_str(),
            &arg_refs(&hook.args),
            Some(root),
        )
    }
}

/// Copy `tree` into a sibling of `root`, then move it into place.
///
/// A failed copy or move removes the staged copy, so `root` is either
/// complete or absent.
fn place_tree(tree: &Utf8Path, root: &Utf8Path) -> Result<()> {
    let staging = root.with_file_name(format!(
        "{}.partial",
        root.file_name().unwrap_or("install")
    ));
    discard(&staging)?;
    let placed = fs_ops::copy_tree(tree, &staging).and_then(|_| fs::rename(&staging, root));
    if let Err(e) = placed {
        if let Err(cleanup) = discard(&staging) {
            warn!("could not remove staged files in {staging}: {cleanup}");
        }
        if root.exists() {
            return Err(InstallerError::InstallConflict {
                path: root.to_owned(),
            });
        }
        return Err(e.into());
    }
    Ok(())
}

fn discard(dir: &Utf8Path) -> std::io::Result<()> {
    match fs_ops::remove_tree(dir) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl InstallablePackage for TarPackage {
    fn core(&self) -> &PackageCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PackageCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        "tar"
    }

    fn unpack(&self, services: &LifecycleServices<'_>) -> Result<Utf8PathBuf> {
        self.core.unpack_to_scratch(services.extractor)
    }

    fn install(&mut self, services: &LifecycleServices<'_>) -> Result<()> {
        let root = self.core.install_root()?;
        if root.exists() {
            return Err(InstallerError::InstallConflict { path: root });
        }

        let scratch = self.unpack(services)?;
        let tree = scratch.join(&self.root_subdir);
        if !tree.is_dir() {
            return Err(ExtractionError::MissingRoot {
                root: self.root_subdir.clone(),
            }
            .into());
        }
        place_tree(&tree, &root)?;
        info!("installed {} to {root}", self.name());

        self.run_post_install(&root, services)?;
        self.core.mark(PackageState::Installed);
        Ok(())
    }

    fn uninstall(&mut self, _services: &LifecycleServices<'_>) -> Result<()> {
        let root = self.core.install_root()?;
        if !root.exists() {
            return Err(InstallerError::NotInstalled {
                package: self.name().to_owned(),
                path: root,
            });
        }
        fs_ops::remove_tree(&root)?;
        info!("removed {root}");
        self.core.mark(PackageState::Uninstalled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ArchiveFormat, MockArchiveExtractor, StandardExtractor};
    use crate::package::fixtures::Home;
    use crate::test_utils::{ExpectedCall, RecordingDownloader, StubExecutor};
    use rstest::{fixture, rstest};
    use std::fs;

    #[fixture]
    fn home() -> Home {
        Home::new()
    }

    fn tarball() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in [
            ("demo-1.0/bin/demo", b"#!/bin/sh\n".as_slice()),
            ("demo-1.0/share/readme", b"hi".as_slice()),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, data).expect("append");
        }
        builder.into_inner().expect("tar finish")
    }

    fn downloaded(home: &Home, post_install: Option<PostInstall>) -> TarPackage {
        let mut core = home.core("demo.tar", None);
        core.download(&RecordingDownloader::serving(tarball()))
            .expect("download");
        TarPackage::new(core, "demo-1.0".to_owned(), post_install)
    }

    #[rstest]
    fn install_copies_root_subtree(home: Home) {
        let mut package = downloaded(&home, None);
        let downloader = RecordingDownloader::default();
        let executor = StubExecutor::default();
        let services = LifecycleServices {
            downloader: &downloader,
            extractor: &StandardExtractor,
            executor: &executor,
        };

        package.install(&services).expect("install");

        let root = home.root.join(".local/opt/demo");
        assert!(root.join("bin/demo").is_file());
        assert_eq!(fs::read_to_string(root.join("share/readme")).expect("read"), "hi");
        assert_eq!(package.state(), PackageState::Installed);
        assert_eq!(executor.invocations(), 0);
    }

    #[rstest]
    fn install_runs_post_install_in_root(home: Home) {
        let hook = PostInstall {
            program: "bin/demo".to_owned(),
            args: vec!["--register-app".to_owned()],
        };
        let mut package = downloaded(&home, Some(hook));
        let root = home.root.join(".local/opt/demo");
        let downloader = RecordingDownloader::default();
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("bin/demo", &["--register-app"], 0).in_dir(root.clone()),
        ]);
        let services = LifecycleServices {
            downloader: &downloader,
            extractor: &StandardExtractor,
            executor: &executor,
        };

        package.install(&services).expect("install");
        executor.assert_finished();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(root.join("bin/demo"))
                .expect("stat")
                .permissions()
                .mode();
            assert_ne!(mode & 0o111, 0);
        }
    }

    #[rstest]
    fn existing_root_conflicts_before_unpacking(home: Home) {
        let mut package = downloaded(&home, None);
        let root = home.root.join(".local/opt/demo");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(root.join("keep.txt"), "mine").expect("write");

        let mut extractor = MockArchiveExtractor::new();
        extractor.expect_extract().times(0);
        let downloader = RecordingDownloader::default();
        let executor = StubExecutor::default();
        let services = LifecycleServices {
            downloader: &downloader,
            extractor: &extractor,
            executor: &executor,
        };

        let err = package.install(&services).expect_err("conflict");
        assert!(matches!(err, InstallerError::InstallConflict { .. }));
        assert_eq!(fs::read_to_string(root.join("keep.txt")).expect("read"), "mine");
        assert_eq!(package.state(), PackageState::Downloaded);
    }

    #[rstest]
    fn interrupted_placement_leaves_no_partial_tree(home: Home) {
        let mut package = downloaded(&home, None);
        let root = home.root.join(".local/opt/demo");
        let staging = home.root.join(".local/opt/demo.partial");

        let mut extractor = MockArchiveExtractor::new();
        let competing_root = root.clone();
        extractor.expect_extract().times(1).returning(move |_, dest, _| {
            let tree = dest.join("demo-1.0/bin");
            fs::create_dir_all(&tree).expect("mkdir tree");
            fs::write(tree.join("demo"), "new").expect("write tree");
            fs::create_dir_all(&competing_root).expect("mkdir root");
            fs::write(competing_root.join("keep.txt"), "mine").expect("write");
            Ok(vec!["demo-1.0/bin/demo".to_owned()])
        });
        let downloader = RecordingDownloader::default();
        let executor = StubExecutor::default();
        let services = LifecycleServices {
            downloader: &downloader,
            extractor: &extractor,
            executor: &executor,
        };

        let err = package.install(&services).expect_err("root appeared");
        assert!(matches!(err, InstallerError::InstallConflict { .. }));
        assert!(!staging.exists());
        assert!(!root.join("bin").exists());
        assert_eq!(fs::read_to_string(root.join("keep.txt")).expect("read"), "mine");
        assert_eq!(package.state(), PackageState::Downloaded);
    }

    #[rstest]
    fn stale_staging_is_replaced(home: Home) {
        let staging = home.root.join(".local/opt/demo.partial");
        fs::create_dir_all(staging.join("leftover")).expect("mkdir stale");
        let mut package = downloaded(&home, None);
        let downloader = RecordingDownloader::default();
        let executor = StubExecutor::default();
        let services = LifecycleServices {
            downloader: &downloader,
            extractor: &StandardExtractor,
            executor: &executor,
        };

        package.install(&services).expect("install");

        let root = home.root.join(".local/opt/demo");
        assert!(root.join("bin/demo").is_file());
        assert!(!root.join("leftover").exists());
        assert!(!staging.exists());
    }

    #[rstest]
    fn missing_root_subdir_is_reported(home: Home) {
        let mut core = home.core("demo.tar", None);
        core.download(&RecordingDownloader::serving(tarball()))
            .expect("download");
        let mut package = TarPackage::new(core, "other".to_owned(), None);

        let mut extractor = MockArchiveExtractor::new();
        extractor
            .expect_extract()
            .withf(|_, _, format| *format == ArchiveFormat::Tar)
            .returning(|_, _, _| Ok(vec!["demo-1.0/bin/demo".to_owned()]));
        let downloader = RecordingDownloader::default();
        let executor = StubExecutor::default();
        let services = LifecycleServices {
            downloader: &downloader,
            extractor: &extractor,
            executor: &executor,
        };

        let err = package.install(&services).expect_err("no such root");
        assert!(matches!(
            err,
            InstallerError::Extraction(ExtractionError::MissingRoot { .. })
        ));
    }

    #[rstest]
    fn uninstall_removes_root_and_reports_absence(home: Home) {
        let mut package = downloaded(&home, None);
        let downloader = RecordingDownloader::default();
        let executor = StubExecutor::default();
        let services = LifecycleServices {
            downloader: &downloader,
            extractor: &StandardExtractor,
            executor: &executor,
        };
        package.install(&services).expect("install");

        package.uninstall(&services).expect("uninstall");
        assert!(!home.root.join(".local/opt/demo").exists());
        assert_eq!(package.state(), PackageState::Uninstalled);

        let err = package.uninstall(&services).expect_err("already gone");
        assert!(matches!(err, InstallerError::NotInstalled { .. }));
    }
}
