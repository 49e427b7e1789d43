//! Directory resolution policy.
//!
//! [`directory_for`] maps a directory category, privilege mode, platform and
//! home directory onto a path. It performs no I/O and never creates
//! directories. Categories without a convention on a platform resolve to
//! `None`; callers must handle absence rather than receive a made-up path.
//!
//! [`DirectoryResolver`] is the capability seam the rest of the workspace
//! depends on. [`resolver_for`] selects the implementation for a platform.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

use crate::platform::{Platform, PrivilegeMode};

/// Icon resolution used when callers do not ask for a specific size.
pub const DEFAULT_ICON_RESOLUTION: &str = "128x128";

/// Directory categories understood by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirKind {
    /// Configuration files.
    Config,
    /// Caches and downloaded artefacts.
    Cache,
    /// Executables and launcher scripts.
    Binary,
    /// Shared libraries.
    Library,
    /// Self-contained application trees.
    Opt,
    /// Architecture-independent data.
    Data,
    /// Log files. No platform assigns this yet.
    Log,
    /// Root of the `hicolor` icon theme.
    IconTheme,
    /// Desktop themes.
    Themes,
    /// Freedesktop `.desktop` launchers.
    DesktopEntry,
}

impl DirKind {
    /// Every category, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Config,
        Self::Cache,
        Self::Binary,
        Self::Library,
        Self::Opt,
        Self::Data,
        Self::Log,
        Self::IconTheme,
        Self::Themes,
        Self::DesktopEntry,
    ];

    /// Short lowercase label used in diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Cache => "cache",
            Self::Binary => "binary",
            Self::Library => "library",
            Self::Opt => "opt",
            Self::Data => "data",
            Self::Log => "log",
            Self::IconTheme => "icon-theme",
            Self::Themes => "themes",
            Self::DesktopEntry => "desktop-entry",
        }
    }
}

impl fmt::Display for DirKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve the directory for `kind`.
///
/// The result depends only on the arguments, so two calls with the same
/// inputs always agree.
///
/// # Examples
///
/// ```
/// use appkeep_common::paths::{DirKind, directory_for};
/// use appkeep_common::platform::{Platform, PrivilegeMode};
/// use camino::{Utf8Path, Utf8PathBuf};
///
/// let home = Utf8Path::new("/home/ana");
/// assert_eq!(
///     directory_for(DirKind::Binary, PrivilegeMode::User, Platform::Linux, home),
///     Some(Utf8PathBuf::from("/home/ana/.local/bin")),
/// );
/// assert_eq!(
///     directory_for(DirKind::Opt, PrivilegeMode::User, Platform::Windows, home),
///     None,
/// );
/// ```
#[must_use]
pub fn directory_for(
    kind: DirKind,
    mode: PrivilegeMode,
    platform: Platform,
    home: &Utf8Path,
) -> Option<Utf8PathBuf> {
    match platform {
        Platform::Linux => linux_directory(kind, mode, home),
        Platform::Windows => windows_directory(kind, home),
        Platform::Other => None,
    }
}

fn linux_directory(kind: DirKind, mode: PrivilegeMode, home: &Utf8Path) -> Option<Utf8PathBuf> {
    match mode {
        PrivilegeMode::System => linux_system_directory(kind).map(Utf8PathBuf::from),
        PrivilegeMode::User => linux_user_segments(kind).map(|segments| join_all(home, segments)),
    }
}

const fn linux_system_directory(kind: DirKind) -> Option<&'static str> {
    match kind {
        DirKind::Config => Some("/etc"),
        DirKind::Cache => Some("/var/cache"),
        DirKind::Binary => Some("/usr/local/bin"),
        DirKind::Library => Some("/usr/local/lib"),
        DirKind::Opt => Some("/opt"),
        DirKind::Data => Some("/usr/share"),
        DirKind::IconTheme => Some("/usr/share/icons/hicolor"),
        DirKind::Themes => Some("/usr/share/themes"),
        DirKind::DesktopEntry => Some("/usr/share/applications"),
        DirKind::Log => None,
    }
}

const fn linux_user_segments(kind: DirKind) -> Option<&'static [&'static str]> {
    match kind {
        DirKind::Config => Some(&[".config"]),
        DirKind::Cache => Some(&[".cache"]),
        DirKind::Binary => Some(&[".local", "bin"]),
        DirKind::Library => Some(&[".local", "lib"]),
        DirKind::Opt => Some(&[".local", "opt"]),
        DirKind::Data => Some(&[".local", "share"]),
        DirKind::IconTheme => Some(&[".local", "share", "icons", "hicolor"]),
        DirKind::Themes => Some(&[".local", "share", "themes"]),
        DirKind::DesktopEntry => Some(&[".local", "share", "applications"]),
        DirKind::Log => None,
    }
}

fn windows_directory(kind: DirKind, home: &Utf8Path) -> Option<Utf8PathBuf> {
    let segments: &[&str] = match kind {
        DirKind::Config => &["AppData", "Roaming"],
        DirKind::Cache => &["AppData", "Local"],
        DirKind::Binary => &["AppData", "Local", "Programs"],
        _ => return None,
    };
    Some(join_all(home, segments))
}

fn join_all(base: &Utf8Path, segments: &[&str]) -> Utf8PathBuf {
    segments
        .iter()
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

/// Capability interface for platform directory lookup.
///
/// Implementors answer [`resolve`](Self::resolve); the named accessors are
/// provided on top of it.
#[cfg_attr(test, mockall::automock)]
pub trait DirectoryResolver {
    /// Resolve the directory for `kind`, or `None` when the platform has no
    /// convention for it.
    fn resolve(&self, kind: DirKind) -> Option<Utf8PathBuf>;

    /// Configuration root.
    fn config_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Config)
    }

    /// Cache root.
    fn cache_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Cache)
    }

    /// Executable directory.
    fn binary_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Binary)
    }

    /// Shared library directory.
    fn lib_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Library)
    }

    /// Root for self-contained application trees.
    fn opt_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Opt)
    }

    /// Data root.
    fn data_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Data)
    }

    /// Log directory. Always `None` for now.
    fn log_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Log)
    }

    /// Root of the `hicolor` icon theme.
    fn hicolor_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::IconTheme)
    }

    /// Application icon directory for a resolution such as `128x128`.
    fn icon_dir(&self, resolution: &str) -> Option<Utf8PathBuf> {
        self.hicolor_dir()
            .map(|root| root.join(resolution).join("apps"))
    }

    /// Desktop theme directory.
    fn themes_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::Themes)
    }

    /// Directory holding `.desktop` launchers.
    fn desktop_entry_dir(&self) -> Option<Utf8PathBuf> {
        self.resolve(DirKind::DesktopEntry)
    }
}

/// Linux resolver for one privilege mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosixDirs {
    home: Utf8PathBuf,
    mode: PrivilegeMode,
}

impl PosixDirs {
    /// Create a resolver rooted at `home`.
    #[must_use]
    pub const fn new(home: Utf8PathBuf, mode: PrivilegeMode) -> Self {
        Self { home, mode }
    }
}

impl DirectoryResolver for PosixDirs {
    fn resolve(&self, kind: DirKind) -> Option<Utf8PathBuf> {
        directory_for(kind, self.mode, Platform::Linux, &self.home)
    }
}

/// Windows resolver. Only config, cache and binary directories exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsDirs {
    home: Utf8PathBuf,
}

impl WindowsDirs {
    /// Create a resolver rooted at the user profile directory.
    #[must_use]
    pub const fn new(home: Utf8PathBuf) -> Self {
        Self { home }
    }
}

impl DirectoryResolver for WindowsDirs {
    fn resolve(&self, kind: DirKind) -> Option<Utf8PathBuf> {
        directory_for(kind, PrivilegeMode::User, Platform::Windows, &self.home)
    }
}

/// Resolver for platforms without directory conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnsupportedDirs;

impl DirectoryResolver for UnsupportedDirs {
    fn resolve(&self, _kind: DirKind) -> Option<Utf8PathBuf> {
        None
    }
}

/// Select the resolver implementation for `platform`.
#[must_use]
pub fn resolver_for(
    platform: Platform,
    mode: PrivilegeMode,
    home: Utf8PathBuf,
) -> Box<dyn DirectoryResolver> {
    match platform {
        Platform::Linux => Box::new(PosixDirs::new(home, mode)),
        Platform::Windows => Box::new(WindowsDirs::new(home)),
        Platform::Other => Box::new(UnsupportedDirs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HOME: &str = "/home/ana";

    fn home() -> &'static Utf8Path {
        Utf8Path::new(HOME)
    }

    #[rstest]
    #[case(DirKind::Config, "/etc")]
    #[case(DirKind::Cache, "/var/cache")]
    #[case(DirKind::Binary, "/usr/local/bin")]
    #[case(DirKind::Library, "/usr/local/lib")]
    #[case(DirKind::Opt, "/opt")]
    #[case(DirKind::Data, "/usr/share")]
    #[case(DirKind::IconTheme, "/usr/share/icons/hicolor")]
    #[case(DirKind::Themes, "/usr/share/themes")]
    #[case(DirKind::DesktopEntry, "/usr/share/applications")]
    fn linux_system_paths(#[case] kind: DirKind, #[case] expected: &str) {
        let path = directory_for(kind, PrivilegeMode::System, Platform::Linux, home());
        assert_eq!(path, Some(Utf8PathBuf::from(expected)));
    }

    #[rstest]
    #[case(DirKind::Config, "/home/ana/.config")]
    #[case(DirKind::Cache, "/home/ana/.cache")]
    #[case(DirKind::Binary, "/home/ana/.local/bin")]
    #[case(DirKind::Library, "/home/ana/.local/lib")]
    #[case(DirKind::Opt, "/home/ana/.local/opt")]
    #[case(DirKind::Data, "/home/ana/.local/share")]
    #[case(DirKind::IconTheme, "/home/ana/.local/share/icons/hicolor")]
    #[case(DirKind::Themes, "/home/ana/.local/share/themes")]
    #[case(DirKind::DesktopEntry, "/home/ana/.local/share/applications")]
    fn linux_user_paths(#[case] kind: DirKind, #[case] expected: &str) {
        let path = directory_for(kind, PrivilegeMode::User, Platform::Linux, home());
        assert_eq!(path, Some(Utf8PathBuf::from(expected)));
    }

    #[rstest]
    #[case(DirKind::Config, Some("/home/ana/AppData/Roaming"))]
    #[case(DirKind::Cache, Some("/home/ana/AppData/Local"))]
    #[case(DirKind::Binary, Some("/home/ana/AppData/Local/Programs"))]
    #[case(DirKind::Opt, None)]
    #[case(DirKind::Data, None)]
    #[case(DirKind::Log, None)]
    #[case(DirKind::DesktopEntry, None)]
    fn windows_paths_ignore_mode(#[case] kind: DirKind, #[case] expected: Option<&str>) {
        for mode in [PrivilegeMode::User, PrivilegeMode::System] {
            let path = directory_for(kind, mode, Platform::Windows, home());
            assert_eq!(path, expected.map(Utf8PathBuf::from));
        }
    }

    #[test]
    fn log_dir_is_absent_everywhere() {
        for platform in [Platform::Linux, Platform::Windows, Platform::Other] {
            for mode in [PrivilegeMode::User, PrivilegeMode::System] {
                assert_eq!(directory_for(DirKind::Log, mode, platform, home()), None);
            }
        }
    }

    #[test]
    fn other_platforms_resolve_nothing() {
        for kind in DirKind::ALL {
            assert_eq!(
                directory_for(kind, PrivilegeMode::User, Platform::Other, home()),
                None
            );
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        for platform in [Platform::Linux, Platform::Windows, Platform::Other] {
            for mode in [PrivilegeMode::User, PrivilegeMode::System] {
                for kind in DirKind::ALL {
                    assert_eq!(
                        directory_for(kind, mode, platform, home()),
                        directory_for(kind, mode, platform, home()),
                    );
                }
            }
        }
    }

    #[test]
    fn icon_dir_appends_resolution_and_apps() {
        let dirs = PosixDirs::new(Utf8PathBuf::from(HOME), PrivilegeMode::System);
        assert_eq!(
            dirs.icon_dir(DEFAULT_ICON_RESOLUTION),
            Some(Utf8PathBuf::from("/usr/share/icons/hicolor/128x128/apps"))
        );
    }

    #[test]
    fn windows_resolver_has_no_icon_dir() {
        let dirs = WindowsDirs::new(Utf8PathBuf::from(HOME));
        assert_eq!(dirs.icon_dir(DEFAULT_ICON_RESOLUTION), None);
    }

    #[test]
    fn factory_selects_platform_implementation() {
        let linux = resolver_for(
            Platform::Linux,
            PrivilegeMode::User,
            Utf8PathBuf::from(HOME),
        );
        assert_eq!(
            linux.config_dir(),
            Some(Utf8PathBuf::from("/home/ana/.config"))
        );

        let windows = resolver_for(
            Platform::Windows,
            PrivilegeMode::System,
            Utf8PathBuf::from(HOME),
        );
        assert_eq!(windows.opt_dir(), None);

        let other = resolver_for(
            Platform::Other,
            PrivilegeMode::User,
            Utf8PathBuf::from(HOME),
        );
        assert_eq!(other.cache_dir(), None);
    }
}
