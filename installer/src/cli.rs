//! CLI argument definitions for appkeep.
//!
//! Kept apart from the entrypoint so parsing can be tested without running
//! anything.

use appkeep_common::platform::PrivilegeMode;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Download, verify and install desktop applications.
#[derive(Parser, Debug)]
#[command(name = "appkeep")]
#[command(version, about)]
#[command(long_about = concat!(
    "Download, verify and install desktop applications.\n\n",
    "Packages come from built-in presets or JSON descriptor files. Every ",
    "download is checked against its expected digest before anything is ",
    "installed; a mismatch stops the run.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install Tor Browser for the current user:\n",
    "    $ appkeep install torbrowser\n\n",
    "  Install from a descriptor into a system-wide location:\n",
    "    $ sudo appkeep install --descriptor tool.json --system\n\n",
    "  Show where an application would be installed:\n",
    "    $ appkeep dirs --app torbrowser --json",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download, verify and install a package.
    Install(InstallArgs),

    /// Remove an installed package.
    Uninstall(UninstallArgs),

    /// Print the directories resolved for an application.
    Dirs(DirsArgs),

    /// List built-in presets.
    Presets,

    /// Show or change persistent settings.
    Config(ConfigArgs),
}

/// Which package to act on: a preset name or a descriptor file.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct PackageSelector {
    /// Built-in preset name (see `appkeep presets`).
    #[arg(value_name = "PRESET")]
    pub preset: Option<String>,

    /// JSON package descriptor file.
    #[arg(short, long, value_name = "FILE")]
    pub descriptor: Option<Utf8PathBuf>,
}

/// Arguments for `install`.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Package to install.
    #[command(flatten)]
    pub package: PackageSelector,

    /// Download directory [default: saved setting, then the app cache dir].
    #[arg(short, long, value_name = "DIR")]
    pub save_dir: Option<Utf8PathBuf>,

    /// Install for all users (requires elevation on POSIX systems).
    #[arg(long)]
    pub system: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for `uninstall`.
#[derive(Args, Debug, Clone, Default)]
pub struct UninstallArgs {
    /// Package to remove.
    #[command(flatten)]
    pub package: PackageSelector,

    /// Remove a system-wide installation.
    #[arg(long)]
    pub system: bool,
}

/// Arguments for `dirs`.
#[derive(Args, Debug, Clone)]
pub struct DirsArgs {
    /// Application name.
    #[arg(short, long, value_name = "NAME", default_value = "appkeep")]
    pub app: String,

    /// Resolve system-wide directories.
    #[arg(long)]
    pub system: bool,

    /// Output JSON for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `config`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Persist the default download directory.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<Utf8PathBuf>,
}

/// Map a `--system` flag to the requested privilege mode.
#[must_use]
pub const fn requested_mode(system: bool) -> PrivilegeMode {
    if system {
        PrivilegeMode::System
    } else {
        PrivilegeMode::User
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
