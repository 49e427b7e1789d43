//! External process execution.
//!
//! Installers and post-install hooks run with the caller's environment and
//! inherited standard streams so that interactive installers keep working.

use camino::Utf8Path;
use log::info;
use std::process::{Command, ExitStatus};

use crate::error::{InstallerError, Result};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `program` with `args`, optionally inside `cwd`, and waits for it.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or waiting for the
    /// process. A non-zero exit is not an error at this level.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use appkeep_installer::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let status = SystemCommandExecutor.run("tar", &["--version"], None)?;
    /// assert!(status.success());
    /// # Ok::<(), appkeep_installer::error::InstallerError>(())
    /// ```
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<ExitStatus>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<ExitStatus> {
        info!("running {program} {}", args.join(" "));
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command.status().map_err(InstallerError::from)
    }
}

/// Run a command and turn a non-zero exit into
/// [`InstallerError::ExternalProcess`].
///
/// # Errors
///
/// Propagates spawn failures and reports unsuccessful exits.
pub fn run_checked(
    executor: &dyn CommandExecutor,
    program: &str,
    args: &[&str],
    cwd: Option<&Utf8Path>,
) -> Result<()> {
    let status = executor.run(program, args, cwd)?;
    if status.success() {
        Ok(())
    } else {
        Err(InstallerError::ExternalProcess {
            program: program.to_owned(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor};

    #[test]
    fn run_checked_accepts_zero_exit() {
        let executor = StubExecutor::new(vec![ExpectedCall::new("installer.exe", &[], 0)]);
        assert!(run_checked(&executor, "installer.exe", &[], None).is_ok());
        executor.assert_finished();
    }

    #[test]
    fn run_checked_reports_non_zero_exit() {
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("python3", &["setup.py"], 2).in_dir("/tmp"),
        ]);
        let err = run_checked(&executor, "python3", &["setup.py"], Some(Utf8Path::new("/tmp")))
            .expect_err("non-zero exit");
        assert!(matches!(
            err,
            InstallerError::ExternalProcess { ref program, status }
                if program == "python3" && status.code() == Some(2)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_runs_in_working_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cwd = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8");
        let status = SystemCommandExecutor
            .run("sh", &["-c", "touch marker"], Some(&cwd))
            .expect("spawn sh");
        assert!(status.success());
        assert!(cwd.join("marker").exists());
    }
}
