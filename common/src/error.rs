//! Error types for directory construction and JSON config files.

use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building [`UserDirs`](crate::user_dirs::UserDirs) or
/// [`AppDirs`](crate::app_dirs::AppDirs).
///
/// All variants are configuration failures: they occur before any directory
/// is touched and abort construction.
#[derive(Debug, Error)]
pub enum DirsError {
    /// The application name was not supplied or is blank.
    #[error("application name must not be empty")]
    MissingAppName,

    /// The home directory of the invoking user could not be determined.
    #[error("could not determine the home directory")]
    HomeUnavailable,

    /// The home directory is not valid UTF-8.
    #[error("home directory is not valid UTF-8: {}", path.display())]
    NonUtf8Home {
        /// The rejected path.
        path: PathBuf,
    },

    /// The scratch directory or file could not be allocated.
    #[error("failed to allocate scratch path")]
    Scratch {
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A scratch path allocated by the OS is not valid UTF-8.
    #[error("scratch path is not valid UTF-8: {}", path.display())]
    NonUtf8Scratch {
        /// The rejected path.
        path: PathBuf,
    },
}

/// Errors raised by [`JsonFile`](crate::json_file::JsonFile) writes.
#[derive(Debug, Error)]
pub enum JsonFileError {
    /// The file or its parent directory could not be written.
    #[error("failed to write {path}")]
    Io {
        /// The JSON file path.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The mapping could not be serialized.
    #[error("failed to serialize {path}")]
    Serialize {
        /// The JSON file path.
        path: Utf8PathBuf,
        /// The underlying serializer failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias using [`DirsError`].
pub type Result<T> = std::result::Result<T, DirsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_app_name_message() {
        assert_eq!(
            DirsError::MissingAppName.to_string(),
            "application name must not be empty"
        );
    }

    #[test]
    fn scratch_error_preserves_source() {
        let err = DirsError::Scratch {
            source: std::io::Error::other("disk full"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn json_io_error_names_path() {
        let err = JsonFileError::Io {
            path: Utf8PathBuf::from("/tmp/app.json"),
            source: std::io::Error::other("denied"),
        };
        assert!(err.to_string().contains("/tmp/app.json"));
    }
}
