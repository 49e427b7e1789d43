//! JSON package descriptors and built-in presets.
//!
//! A descriptor names an application, where its artefact comes from, the
//! digest it must match and how it installs:
//!
//! ```json
//! {
//!   "name": "torbrowser",
//!   "file": "tor-browser-linux64-11.0.14_pt-BR.tar.xz",
//!   "url": "https://www.torproject.org/dist/torbrowser/11.0.14/tor-browser-linux64-11.0.14_pt-BR.tar.xz",
//!   "digest": { "algorithm": "sha256", "hex": "380b…7486" },
//!   "kind": {
//!     "tar": {
//!       "root": "tor-browser_pt-BR",
//!       "post_install": {
//!         "program": "start-tor-browser.desktop",
//!         "args": ["--register-app"]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! `kind` may also be `"native_installer"` or
//! `{ "runtime_zip": { "runtime": …, "args": […], "workdir": … } }`.

use appkeep_common::app_dirs::AppDirs;
use appkeep_common::integrity::DigestKind;
use appkeep_common::platform::Platform;
use camino::Utf8Path;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{InstallerError, Result};
use crate::package::{PackageBuilder, PackageKind, PostInstall, RuntimeCommand};

/// Expected digest as written in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DigestSpec {
    /// Algorithm name: `md5`, `sha1`, `sha256` or `sha512`.
    pub algorithm: String,
    /// Expected lowercase hex digest.
    pub hex: String,
}

/// Post-install command as written in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostInstallSpec {
    /// Program path relative to the install root.
    pub program: String,
    /// Arguments for the program.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Package variant as written in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum KindSpec {
    /// Archive copied into the install root.
    Tar {
        /// Top-level directory inside the archive.
        root: String,
        /// Command run inside the install root afterwards.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        post_install: Option<PostInstallSpec>,
    },
    /// Executable installer.
    NativeInstaller,
    /// Zip archive installed by a runtime command.
    RuntimeZip {
        /// Runtime executable.
        runtime: String,
        /// Arguments for the runtime.
        #[serde(default)]
        args: Vec<String>,
        /// Working directory relative to the unpacked archive.
        #[serde(default = "KindSpec::default_workdir")]
        workdir: String,
    },
}

impl KindSpec {
    fn default_workdir() -> String {
        ".".to_owned()
    }
}

impl From<KindSpec> for PackageKind {
    fn from(spec: KindSpec) -> Self {
        match spec {
            KindSpec::Tar { root, post_install } => Self::Tar {
                root,
                post_install: post_install.map(|hook| PostInstall {
                    program: hook.program,
                    args: hook.args,
                }),
            },
            KindSpec::NativeInstaller => Self::NativeInstaller,
            KindSpec::RuntimeZip {
                runtime,
                args,
                workdir,
            } => Self::RuntimeZip(RuntimeCommand {
                runtime,
                args,
                workdir,
            }),
        }
    }
}

/// A package description loaded from JSON or a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDescriptor {
    /// Application name; also names the application's directories.
    pub name: String,
    /// File name of the downloaded artefact.
    pub file: String,
    /// Download URL.
    pub url: String,
    /// Expected digest. Packages without one never verify.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestSpec>,
    /// Package variant.
    pub kind: KindSpec,
}

impl PackageDescriptor {
    /// Parse a descriptor from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Descriptor`] when the text is not a valid
    /// descriptor.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| InstallerError::Descriptor {
            reason: e.to_string(),
        })
    }

    /// Read and parse a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Descriptor`] when the file cannot be read or
    /// parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        debug!("loading package descriptor {path}");
        let text = fs::read_to_string(path).map_err(|e| InstallerError::Descriptor {
            reason: format!("{path}: {e}"),
        })?;
        serde_json::from_str(&text).map_err(|e| InstallerError::Descriptor {
            reason: format!("{path}: {e}"),
        })
    }

    /// Start a [`PackageBuilder`] for this descriptor targeting `app_dirs`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Descriptor`] when the digest algorithm is
    /// unknown.
    pub fn into_builder(self, app_dirs: AppDirs) -> Result<PackageBuilder> {
        let mut builder = PackageBuilder::default()
            .app_dirs(app_dirs)
            .file_name(self.file)
            .url(self.url)
            .kind(self.kind.into());
        if let Some(digest) = self.digest {
            let kind = digest
                .algorithm
                .parse::<DigestKind>()
                .map_err(|e| InstallerError::Descriptor {
                    reason: e.to_string(),
                })?;
            builder = builder.digest(kind, digest.hex);
        }
        Ok(builder)
    }
}

/// A built-in descriptor recipe.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// Preset name used on the command line.
    pub name: &'static str,
    /// One-line description.
    pub summary: &'static str,
    build: fn(Platform) -> Option<PackageDescriptor>,
}

impl Preset {
    /// The descriptor for `platform`, if the preset supports it.
    #[must_use]
    pub fn descriptor(self, platform: Platform) -> Option<PackageDescriptor> {
        (self.build)(platform)
    }
}

const TOR_BROWSER_BASE: &str = "https://www.torproject.org/dist/torbrowser/11.0.14";
const TOR_BROWSER_LINUX: &str = "tor-browser-linux64-11.0.14_pt-BR.tar.xz";
const TOR_BROWSER_LINUX_SHA256: &str =
    "380bd310e55ca10622fb9aac2e013d7cc38c1619201780b761919f32fe0e7486";
const TOR_BROWSER_WINDOWS: &str = "torbrowser-install-win64-11.0.14_pt-BR.exe";
const TOR_BROWSER_WINDOWS_SHA256: &str =
    "3f2f67525d964ee86b42d78eec23baa05afc628d0610ad68027cf6a0f9a52a3d";

fn tor_browser(platform: Platform) -> Option<PackageDescriptor> {
    let (file, sha256, kind) = match platform {
        Platform::Linux => (
            TOR_BROWSER_LINUX,
            TOR_BROWSER_LINUX_SHA256,
            KindSpec::Tar {
                root: "tor-browser_pt-BR".to_owned(),
                post_install: Some(PostInstallSpec {
                    program: "start-tor-browser.desktop".to_owned(),
                    args: vec!["--register-app".to_owned()],
                }),
            },
        ),
        Platform::Windows => (
            TOR_BROWSER_WINDOWS,
            TOR_BROWSER_WINDOWS_SHA256,
            KindSpec::NativeInstaller,
        ),
        Platform::Other => return None,
    };
    Some(PackageDescriptor {
        name: "torbrowser".to_owned(),
        file: file.to_owned(),
        url: format!("{TOR_BROWSER_BASE}/{file}"),
        digest: Some(DigestSpec {
            algorithm: DigestKind::Sha256.name().to_owned(),
            hex: sha256.to_owned(),
        }),
        kind,
    })
}

const PRESETS: &[Preset] = &[Preset {
    name: "torbrowser",
    summary: "Tor Browser 11.0.14 (pt-BR)",
    build: tor_browser,
}];

/// All built-in presets.
#[must_use]
pub const fn presets() -> &'static [Preset] {
    PRESETS
}

/// Look up a preset's descriptor for `platform`.
///
/// # Errors
///
/// Returns [`InstallerError::Descriptor`] when no preset has that name or it
/// does not support the platform.
pub fn preset(name: &str, platform: Platform) -> Result<PackageDescriptor> {
    let found = PRESETS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| InstallerError::Descriptor {
            reason: format!("unknown preset `{name}`"),
        })?;
    found
        .descriptor(platform)
        .ok_or_else(|| InstallerError::Descriptor {
            reason: format!("preset `{name}` is not available on {platform}"),
        })
}
