//! Error types for the appkeep installer.
//!
//! Each variant names the lifecycle concern that failed so the driver can
//! report the failing step with enough context to act on it.

use appkeep_common::error::{DirsError, JsonFileError};
use appkeep_common::paths::DirKind;
use camino::Utf8PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use crate::download::DownloadError;
use crate::extraction::ExtractionError;
use crate::package::PackageState;

/// Errors that can occur while driving a package through its lifecycle.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// Directory or package configuration is invalid. Raised before any I/O.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// Description of the problem.
        reason: String,
    },

    /// Directory construction failed.
    #[error(transparent)]
    Dirs(#[from] DirsError),

    /// The platform has no directory for a category an operation needs.
    #[error("no {category} directory on this platform")]
    PathUnsupported {
        /// The missing directory category.
        category: DirKind,
    },

    /// The artefact could not be transferred.
    #[error("download failed")]
    Transfer(#[source] DownloadError),

    /// The downloaded artefact failed integrity verification.
    #[error("verification failed for {package}: {reason}")]
    Verification {
        /// Application name of the package.
        package: String,
        /// Why verification failed.
        reason: String,
    },

    /// The install root already exists.
    #[error("{path} already exists; uninstall first")]
    InstallConflict {
        /// The existing install root.
        path: Utf8PathBuf,
    },

    /// An installer or post-install command exited unsuccessfully.
    #[error("{program} failed with {status}")]
    ExternalProcess {
        /// The program that was run.
        program: String,
        /// Its exit status.
        status: ExitStatus,
    },

    /// The archive could not be unpacked.
    #[error("extraction failed")]
    Extraction(#[from] ExtractionError),

    /// The package variant does not support the operation.
    #[error("{operation} is not supported for {kind} packages")]
    UnsupportedOperation {
        /// The lifecycle operation.
        operation: &'static str,
        /// The package variant label.
        kind: &'static str,
    },

    /// The operation is not valid in the package's current state.
    #[error("cannot {operation} a package in state {state}")]
    InvalidState {
        /// The lifecycle operation.
        operation: &'static str,
        /// The package state at the time of the call.
        state: PackageState,
    },

    /// Uninstall found nothing to remove.
    #[error("{package} is not installed at {path}")]
    NotInstalled {
        /// Application name of the package.
        package: String,
        /// The install root that was checked.
        path: Utf8PathBuf,
    },

    /// A package descriptor is malformed or unknown.
    #[error("invalid package descriptor: {reason}")]
    Descriptor {
        /// Description of the problem.
        reason: String,
    },

    /// The settings file could not be written.
    #[error("could not update settings")]
    Settings(#[from] JsonFileError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
