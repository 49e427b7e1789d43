//! Filesystem helpers for install roots and downloads.

use camino::Utf8Path;
use log::debug;
use std::fs;
use std::io;
use walkdir::WalkDir;

/// Create `dir` and its parents. Succeeds when it already exists.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn ensure_dir(dir: &Utf8Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Remove a directory tree.
///
/// # Errors
///
/// Returns the underlying I/O error, including `NotFound`.
pub fn remove_tree(dir: &Utf8Path) -> io::Result<()> {
    debug!("removing {dir}");
    fs::remove_dir_all(dir)
}

/// Remove a file, treating an absent file as success.
///
/// # Errors
///
/// Returns any I/O error other than `NotFound`.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Copy the tree rooted at `src` to `dst`, creating `dst`.
///
/// File permissions are preserved; symbolic links are recreated on Unix and
/// followed elsewhere. Returns the number of files copied.
///
/// # Errors
///
/// Returns the first I/O or traversal error.
pub fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> io::Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(!cfg!(unix)) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = dst.as_std_path().join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    debug!("copied {copied} files from {src} to {dst}");
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &std::path::Path, target: &std::path::Path) -> io::Result<()> {
    let points_to = fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &std::path::Path, target: &std::path::Path) -> io::Result<()> {
    fs::copy(link, target).map(|_| ())
}

/// Add execute permission for everyone who can read the file.
///
/// A no-op on platforms without Unix permissions.
///
/// # Errors
///
/// Returns the underlying I/O error.
#[cfg(unix)]
pub fn make_executable(path: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    perms.set_mode(mode | ((mode & 0o444) >> 2));
    fs::set_permissions(path, perms)
}

/// Add execute permission for everyone who can read the file.
///
/// A no-op on platforms without Unix permissions.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn make_executable(_path: &Utf8Path) -> io::Result<()> {
    Ok(())
}
