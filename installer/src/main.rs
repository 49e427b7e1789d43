//! appkeep CLI entrypoint.
//!
//! Resolves a package from a preset or descriptor, then drives it through
//! download, verification and installation (or removal) with a
//! [`CommandSequencer`]. Progress goes to stderr; listings go to stdout.

use appkeep_common::app_dirs::AppDirs;
use appkeep_common::platform::{Platform, PrivilegeMode, is_elevated};
use appkeep_installer::cli::{
    Cli, Command, ConfigArgs, DirsArgs, InstallArgs, PackageSelector, UninstallArgs,
    requested_mode,
};
use appkeep_installer::descriptor::{PackageDescriptor, preset, presets};
use appkeep_installer::download::HttpDownloader;
use appkeep_installer::error::InstallerError;
use appkeep_installer::executor::SystemCommandExecutor;
use appkeep_installer::extraction::StandardExtractor;
use appkeep_installer::output::{
    dirs_json, dirs_text, install_success, presets_text, write_stderr_line,
};
use appkeep_installer::package::{InstallablePackage, LifecycleServices};
use appkeep_installer::sequencer::{CommandSequencer, SequenceFailure};
use appkeep_installer::settings::{APP_NAME, Settings};
use camino::Utf8PathBuf;
use clap::Parser;
use std::error::Error as _;
use std::io::{self, Write};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Failures surfaced by the driver.
#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Installer(#[from] InstallerError),
    #[error(transparent)]
    Sequence(#[from] SequenceFailure),
    #[error("could not render JSON")]
    Json(#[from] serde_json::Error),
}

/// The machine appkeep runs on. Detected in `main`, injected in tests.
#[derive(Debug, Clone)]
struct Host {
    platform: Platform,
    elevated: bool,
    home: Option<Utf8PathBuf>,
}

impl Host {
    fn detect() -> Self {
        Self {
            platform: Platform::current(),
            elevated: is_elevated(),
            home: None,
        }
    }

    fn app_dirs(&self, name: &str, mode: PrivilegeMode) -> Result<AppDirs, InstallerError> {
        let mut builder = AppDirs::builder()
            .app_name(name)
            .privilege_mode(mode)
            .platform(self.platform)
            .elevated(self.elevated);
        if let Some(home) = &self.home {
            builder = builder.home(home.clone());
        }
        Ok(builder.build()?)
    }

    /// Settings belong to the invoking user even when the process is elevated.
    fn settings(&self) -> Result<Settings, InstallerError> {
        let user_host = Self {
            elevated: false,
            ..self.clone()
        };
        Ok(Settings::for_dirs(&user_host.app_dirs(APP_NAME, PrivilegeMode::User)?))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let quiet = matches!(&cli.command, Command::Install(args) if args.quiet);
    let downloader = HttpDownloader::new(quiet);
    let services = LifecycleServices {
        downloader: &downloader,
        extractor: &StandardExtractor,
        executor: &SystemCommandExecutor,
    };

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let run_result = run(&cli, &Host::detect(), services, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run(
    cli: &Cli,
    host: &Host,
    services: LifecycleServices<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<(), RunError> {
    match &cli.command {
        Command::Install(args) => run_install(args, host, services, stderr),
        Command::Uninstall(args) => run_uninstall(args, host, services, stderr),
        Command::Dirs(args) => run_dirs(args, host, stdout),
        Command::Presets => {
            let available: Vec<_> = presets()
                .iter()
                .copied()
                .filter(|p| p.descriptor(host.platform).is_some())
                .collect();
            write_stdout_line(stdout, presets_text(&available));
            Ok(())
        }
        Command::Config(args) => run_config(args, host, stdout, stderr),
    }
}

fn run_install(
    args: &InstallArgs,
    host: &Host,
    services: LifecycleServices<'_>,
    stderr: &mut dyn Write,
) -> Result<(), RunError> {
    let mode = requested_mode(args.system);
    let save_dir = match &args.save_dir {
        Some(dir) => Some(dir.clone()),
        None => host.settings()?.save_dir(),
    };
    let package = build_package(&args.package, host, mode, save_dir)?;
    let root = package.core().install_root().ok();
    let name = package.name().to_owned();

    let mut sink = io::sink();
    let progress: &mut dyn Write = if args.quiet { &mut sink } else { stderr };
    let mut sequencer = CommandSequencer::new(package, services).install_plan();
    sequencer.run(progress)?;
    let root = root.filter(|dir| dir.is_dir());
    write_stderr_line(progress, install_success(&name, root.as_deref()));
    Ok(())
}

fn run_uninstall(
    args: &UninstallArgs,
    host: &Host,
    services: LifecycleServices<'_>,
    stderr: &mut dyn Write,
) -> Result<(), RunError> {
    let package = build_package(&args.package, host, requested_mode(args.system), None)?;
    let name = package.name().to_owned();
    CommandSequencer::new(package, services)
        .uninstall_plan()
        .run(stderr)?;
    write_stderr_line(stderr, format!("Removed {name}"));
    Ok(())
}

fn run_dirs(args: &DirsArgs, host: &Host, stdout: &mut dyn Write) -> Result<(), RunError> {
    let dirs = host.app_dirs(&args.app, requested_mode(args.system))?;
    let summary = dirs.dirs_summary();
    let rendered = if args.json {
        dirs_json(&summary)?
    } else {
        dirs_text(&summary)
    };
    write_stdout_line(stdout, rendered);
    Ok(())
}

fn run_config(
    args: &ConfigArgs,
    host: &Host,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<(), RunError> {
    let settings = host.settings()?;
    if let Some(dir) = &args.save_dir {
        settings.set_save_dir(dir)?;
        write_stderr_line(stderr, format!("save_dir set to {dir}"));
        return Ok(());
    }
    let value = settings
        .save_dir()
        .map_or_else(|| "(unset)".to_owned(), |dir| dir.to_string());
    write_stdout_line(stdout, format!("save_dir = {value}"));
    if let Some(path) = settings.path() {
        write_stdout_line(stdout, format!("# {path}"));
    }
    Ok(())
}

fn build_package(
    selector: &PackageSelector,
    host: &Host,
    mode: PrivilegeMode,
    save_dir: Option<Utf8PathBuf>,
) -> Result<Box<dyn InstallablePackage>, InstallerError> {
    let descriptor = match (&selector.preset, &selector.descriptor) {
        (_, Some(path)) => PackageDescriptor::load(path)?,
        (Some(name), None) => preset(name, host.platform)?,
        (None, None) => {
            return Err(InstallerError::Configuration {
                reason: "no preset or descriptor given".to_owned(),
            });
        }
    };
    let app_dirs = host.app_dirs(&descriptor.name, mode)?;
    let mut builder = descriptor.into_builder(app_dirs)?;
    if let Some(dir) = save_dir {
        builder = builder.save_dir(dir);
    }
    builder.build()
}

fn exit_code_for_run_result(result: Result<(), RunError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            let mut source = err.source();
            while let Some(cause) = source {
                write_stderr_line(stderr, format!("  caused by: {cause}"));
                source = cause.source();
            }
            1
        }
    }
}

fn write_stdout_line(stdout: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stdout, "{message}").is_err() {
        // Nothing useful to do when stdout is gone.
    }
}
