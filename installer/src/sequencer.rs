//! Ordered execution of lifecycle operations with fail-fast abort.
//!
//! A [`CommandSequencer`] owns one package and the services it needs, runs
//! its queued [`LifecycleOp`]s in order and stops at the first failure. The
//! failure names the 1-based step so the driver can report
//! "step 2 of 3 (verify) failed".

use log::{debug, info};
use std::fmt;
use std::io::Write;
use thiserror::Error;

use crate::error::InstallerError;
use crate::output::{step_line, write_stderr_line};
use crate::package::{InstallablePackage, LifecycleServices};

/// A single lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    /// Fetch the artefact.
    Download,
    /// Check the artefact digest.
    Verify,
    /// Install the package.
    Install,
    /// Remove the installed package.
    Uninstall,
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Download => "download",
            Self::Verify => "verify",
            Self::Install => "install",
            Self::Uninstall => "uninstall",
        };
        f.write_str(label)
    }
}

/// The step at which a run aborted.
#[derive(Debug, Error)]
#[error("step {step} of {total} ({op}) failed")]
pub struct SequenceFailure {
    /// 1-based index of the failing step.
    pub step: usize,
    /// Number of queued steps.
    pub total: usize,
    /// The failing operation.
    pub op: LifecycleOp,
    /// Why it failed.
    #[source]
    pub source: InstallerError,
}

/// Operations completed by a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    /// Completed operations, in order.
    pub completed: Vec<LifecycleOp>,
}

/// Runs lifecycle operations against one package.
pub struct CommandSequencer<'a> {
    package: Box<dyn InstallablePackage>,
    services: LifecycleServices<'a>,
    ops: Vec<LifecycleOp>,
}

impl fmt::Debug for CommandSequencer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSequencer")
            .field("package", &self.package)
            .field("ops", &self.ops)
            .finish_non_exhaustive()
    }
}

impl<'a> CommandSequencer<'a> {
    /// Create a sequencer with no queued operations.
    #[must_use]
    pub fn new(package: Box<dyn InstallablePackage>, services: LifecycleServices<'a>) -> Self {
        Self {
            package,
            services,
            ops: Vec::new(),
        }
    }

    /// Queue download, verify and install.
    #[must_use]
    pub fn install_plan(self) -> Self {
        self.push(LifecycleOp::Download)
            .push(LifecycleOp::Verify)
            .push(LifecycleOp::Install)
    }

    /// Queue uninstall.
    #[must_use]
    pub fn uninstall_plan(self) -> Self {
        self.push(LifecycleOp::Uninstall)
    }

    /// Append one operation.
    #[must_use]
    pub fn push(mut self, op: LifecycleOp) -> Self {
        self.ops.push(op);
        self
    }

    /// The queued operations.
    #[must_use]
    pub fn ops(&self) -> &[LifecycleOp] {
        &self.ops
    }

    /// The package being driven.
    #[must_use]
    pub fn package(&self) -> &dyn InstallablePackage {
        self.package.as_ref()
    }

    /// Run every queued operation in order, writing a progress line per step.
    ///
    /// # Errors
    ///
    /// Returns a [`SequenceFailure`] for the first operation that fails; the
    /// remaining operations are not attempted.
    pub fn run(&mut self, stderr: &mut dyn Write) -> Result<RunReport, SequenceFailure> {
        let ops = self.ops.clone();
        let total = ops.len();
        let mut report = RunReport::default();
        for (index, op) in ops.into_iter().enumerate() {
            let step = index + 1;
            write_stderr_line(stderr, step_line(step, total, op, self.package.name()));
            debug!("{}: {op} from state {}", self.package.name(), self.package.state());
            if let Err(source) = self.dispatch(op) {
                info!("{}: {op} failed at step {step} of {total}", self.package.name());
                return Err(SequenceFailure {
                    step,
                    total,
                    op,
                    source,
                });
            }
            report.completed.push(op);
        }
        Ok(report)
    }

    fn dispatch(&mut self, op: LifecycleOp) -> Result<(), InstallerError> {
        let services = self.services;
        match op {
            LifecycleOp::Download => self.package.download(&services),
            LifecycleOp::Verify => self.package.verify(),
            LifecycleOp::Install => self.package.install(&services),
            LifecycleOp::Uninstall => self.package.uninstall(&services),
        }
    }
}
