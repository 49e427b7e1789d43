//! User-facing text for the appkeep CLI.
//!
//! Progress and results go to stderr as plain lines; the `dirs` and
//! `presets` listings are the only things written to stdout.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Write;

use crate::descriptor::Preset;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Progress line printed before a lifecycle step.
///
/// # Example
///
/// ```
/// use appkeep_installer::output::step_line;
///
/// assert_eq!(step_line(2, 3, "verify", "torbrowser"), "[2/3] verify torbrowser");
/// ```
#[must_use]
pub fn step_line(step: usize, total: usize, op: impl Display, package: &str) -> String {
    format!("[{step}/{total}] {op} {package}")
}

/// Closing line after a successful install.
#[must_use]
pub fn install_success(package: &str, root: Option<&Utf8Path>) -> String {
    match root {
        Some(root) => format!("Installed {package} to {root}"),
        None => format!("Installed {package}"),
    }
}

/// Render resolved directories as aligned `KEY  path` lines.
#[must_use]
pub fn dirs_text(summary: &BTreeMap<&'static str, Utf8PathBuf>) -> String {
    let width = summary.keys().map(|k| k.len()).max().unwrap_or(0);
    summary
        .iter()
        .map(|(key, path)| format!("{key:<width$}  {path}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render resolved directories as a pretty JSON object.
///
/// # Errors
///
/// Returns the serialization error, which cannot occur for string maps in
/// practice.
pub fn dirs_json(
    summary: &BTreeMap<&'static str, Utf8PathBuf>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

/// One line per preset: name and summary.
#[must_use]
pub fn presets_text(presets: &[Preset]) -> String {
    let width = presets.iter().map(|p| p.name.len()).max().unwrap_or(0);
    presets
        .iter()
        .map(|p| format!("{:<width$}  {}", p.name, p.summary))
        .collect::<Vec<_>>()
        .join("\n")
}
