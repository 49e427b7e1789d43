//! Shared test utilities for the installer crate.

use camino::{Utf8Path, Utf8PathBuf};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::process::ExitStatus;

use crate::download::{DownloadError, Downloader};
use crate::error::{InstallerError, Result};
use crate::executor::CommandExecutor;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute. Matched by suffix so that callers can expect
    /// a bare file name for a program resolved to an absolute path.
    pub program: String,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The expected working directory, if checked.
    pub cwd: Option<Utf8PathBuf>,
    /// The exit code to report.
    pub code: i32,
}

impl ExpectedCall {
    /// Expect `program args…` and answer with exit `code`.
    #[must_use]
    pub fn new(program: &str, args: &[&str], code: i32) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            cwd: None,
            code,
        }
    }

    /// Also require the working directory.
    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    fn mismatch(&self, program: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Option<String> {
        let args_match = self.args.iter().map(String::as_str).eq(args.iter().copied());
        let cwd_match = self
            .cwd
            .as_deref()
            .is_none_or(|expected| Some(expected) == cwd);
        if program.ends_with(&self.program) && args_match && cwd_match {
            None
        } else {
            Some(format!(
                "expected {:?} {:?} in {:?}, got {program:?} {args:?} in {cwd:?}",
                self.program, self.args, self.cwd
            ))
        }
    }
}

/// A stub implementation of [`CommandExecutor`] for testing.
///
/// Checks each invocation against a queue of expected calls and reports
/// [`InstallerError::StubMismatch`] on any deviation.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    invoked: Cell<usize>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            invoked: Cell::new(0),
        }
    }

    /// Number of invocations received so far.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invoked.get()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<ExitStatus> {
        self.invoked.set(self.invoked.get() + 1);
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| InstallerError::StubMismatch {
                message: format!("unexpected invocation of {program}"),
            })?;
        match call.mismatch(program, args, cwd) {
            Some(message) => Err(InstallerError::StubMismatch { message }),
            None => Ok(exit_status(call.code)),
        }
    }
}

/// A [`Downloader`] that writes fixed bytes and counts transfers.
#[derive(Debug, Default)]
pub struct RecordingDownloader {
    payload: Vec<u8>,
    fail: bool,
    transfers: Cell<usize>,
}

impl RecordingDownloader {
    /// Serve `payload` for every URL.
    #[must_use]
    pub fn serving(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Write a truncated body and then fail, like a dropped connection.
    #[must_use]
    pub fn failing_midway(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            fail: true,
            transfers: Cell::new(0),
        }
    }

    /// Number of transfers performed.
    #[must_use]
    pub fn transfers(&self) -> usize {
        self.transfers.get()
    }
}

impl Downloader for RecordingDownloader {
    fn fetch(&self, url: &str, dest: &Utf8Path) -> std::result::Result<(), DownloadError> {
        self.transfers.set(self.transfers.get() + 1);
        if self.fail {
            let half = self.payload.len() / 2;
            std::fs::write(dest, self.payload.get(..half).unwrap_or_default())?;
            return Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: "connection reset".to_owned(),
            });
        }
        std::fs::write(dest, &self.payload)?;
        Ok(())
    }
}
