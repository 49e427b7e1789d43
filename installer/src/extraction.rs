//! Archive extraction for downloaded packages.
//!
//! Supports plain, gzip, xz and zstd tarballs plus zip archives. Every entry
//! path is validated before anything is written so that an archive cannot
//! place files outside the destination (zip-slip). Tar link entries must
//! point inside the destination, and no entry is written through a link
//! that resolves elsewhere.

use camino::Utf8Path;
use log::trace;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path};

/// Archive container and compression, detected from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Uncompressed `.tar`.
    Tar,
    /// `.tar.gz` or `.tgz`.
    TarGz,
    /// `.tar.xz` or `.txz`.
    TarXz,
    /// `.tar.zst`.
    TarZst,
    /// `.zip`.
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a file name, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// use appkeep_installer::extraction::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::from_file_name("tor-browser-linux64-11.0.14_pt-BR.tar.xz"),
    ///     Some(ArchiveFormat::TarXz),
    /// );
    /// assert_eq!(ArchiveFormat::from_file_name("setup.exe"), None);
    /// ```
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let table: [(&str, Self); 8] = [
            (".tar.gz", Self::TarGz),
            (".tgz", Self::TarGz),
            (".tar.xz", Self::TarXz),
            (".txz", Self::TarXz),
            (".tar.zst", Self::TarZst),
            (".tzst", Self::TarZst),
            (".tar", Self::Tar),
            (".zip", Self::Zip),
        ];
        table
            .into_iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, format)| format)
    }
}

/// Trait for extracting archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract `archive` into `dest`, which must already exist.
    ///
    /// Returns the relative paths of the extracted files.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape `dest`, [`ExtractionError::EmptyArchive`] if nothing was
    /// extracted, and [`ExtractionError::Io`] or [`ExtractionError::Zip`] on
    /// read or write failures.
    fn extract(
        &self,
        archive: &Utf8Path,
        dest: &Utf8Path,
        format: ArchiveFormat,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip container is malformed.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,

    /// The file name matches no supported archive format.
    #[error("unrecognised archive format: {file_name}")]
    UnknownFormat {
        /// The archive file name.
        file_name: String,
    },

    /// The expected top-level directory is missing after extraction.
    #[error("archive has no top-level directory {root}")]
    MissingRoot {
        /// The directory that was expected.
        root: String,
    },
}

/// Default extractor backed by the `tar`, `flate2`, `xz2`, `zstd` and `zip`
/// crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardExtractor;

impl ArchiveExtractor for StandardExtractor {
    fn extract(
        &self,
        archive: &Utf8Path,
        dest: &Utf8Path,
        format: ArchiveFormat,
    ) -> Result<Vec<String>, ExtractionError> {
        let file = File::open(archive)?;
        let extracted = match format {
            ArchiveFormat::Tar => unpack_tar(file, dest.as_std_path())?,
            ArchiveFormat::TarGz => {
                unpack_tar(flate2::read::GzDecoder::new(file), dest.as_std_path())?
            }
            ArchiveFormat::TarXz => {
                unpack_tar(xz2::read::XzDecoder::new(file), dest.as_std_path())?
            }
            ArchiveFormat::TarZst => unpack_tar(zstd::Decoder::new(file)?, dest.as_std_path())?,
            ArchiveFormat::Zip => unpack_zip(file, dest.as_std_path())?,
        };

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(extracted)
    }
}

fn unpack_tar(reader: impl Read, dest: &Path) -> Result<Vec<String>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    let dest_root = dest.canonicalize()?;
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        let entry_type = entry.header().entry_type();

        validate_entry_path(&entry_path)?;
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let target = entry
                .link_name()?
                .ok_or_else(|| traversal(&entry_path))?
                .into_owned();
            validate_link_target(&entry_path, &target, entry_type.is_hard_link())?;
        }
        ensure_parent_inside(&dest_root, &dest_root.join(&entry_path), &entry_path)?;

        if !entry.unpack_in(&dest_root)? {
            return Err(traversal(&entry_path));
        }
        trace!("unpacked {}", entry_path.display());

        if !entry_type.is_dir() {
            extracted.push(entry_path.to_string_lossy().into_owned());
        }
    }
    Ok(extracted)
}

fn unpack_zip(file: File, dest: &Path) -> Result<Vec<String>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractionError::PathTraversal {
                path: entry.name().to_owned(),
            })?;
        validate_entry_path(&relative)?;

        let dest_path = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest_path)?;
        io::copy(&mut entry, &mut out)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))?;
        }
        trace!("unpacked {}", relative.display());
        extracted.push(relative.to_string_lossy().into_owned());
    }
    Ok(extracted)
}

fn traversal(path: &Path) -> ExtractionError {
    ExtractionError::PathTraversal {
        path: path.display().to_string(),
    }
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components, a root, or a drive prefix.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(traversal(path));
    }
    Ok(())
}

/// Reject link targets that point outside the destination.
///
/// Symbolic links resolve against the entry's parent directory; hard links
/// name another entry relative to the archive root.
fn validate_link_target(entry: &Path, target: &Path, hard: bool) -> Result<(), ExtractionError> {
    if target.has_root() {
        return Err(traversal(entry));
    }
    let base = if hard {
        Path::new("")
    } else {
        entry.parent().unwrap_or_else(|| Path::new(""))
    };
    let mut depth = 0_usize;
    for component in base.join(target).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth.checked_sub(1).ok_or_else(|| traversal(entry))?;
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal(entry)),
        }
    }
    Ok(())
}

/// Resolve the nearest existing ancestor of `target` and require it to lie
/// under `root`. Links unpacked by earlier entries are followed.
fn ensure_parent_inside(root: &Path, target: &Path, entry: &Path) -> Result<(), ExtractionError> {
    let mut ancestor = target.parent();
    while let Some(dir) = ancestor {
        if dir.symlink_metadata().is_ok() {
            let resolved = dir.canonicalize().map_err(|_| traversal(entry))?;
            if resolved.starts_with(root) {
                return Ok(());
            }
            return Err(traversal(entry));
        }
        ancestor = dir.parent();
    }
    Err(traversal(entry))
}
