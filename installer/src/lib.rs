//! appkeep installer library.
//!
//! Drives downloadable desktop applications through a verified lifecycle:
//! fetch the artefact, check its digest, then install or remove it in the
//! directories resolved by `appkeep-common`. The `appkeep` binary is a thin
//! clap front end over these modules.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`descriptor`] - JSON package descriptors and built-in presets
//! - [`download`] - Artefact transfer over HTTP
//! - [`error`] - Installer error types
//! - [`executor`] - External process execution
//! - [`extraction`] - Archive unpacking with path traversal checks
//! - [`fs_ops`] - Filesystem helpers for install roots
//! - [`output`] - User-facing text formatting
//! - [`package`] - Package variants and their lifecycle operations
//! - [`sequencer`] - Ordered, fail-fast execution of lifecycle operations
//! - [`settings`] - Persistent appkeep settings

pub mod cli;
pub mod descriptor;
pub mod download;
pub mod error;
pub mod executor;
pub mod extraction;
pub mod fs_ops;
pub mod output;
pub mod package;
pub mod sequencer;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
