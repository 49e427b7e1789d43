//! Whole-file JSON mappings.
//!
//! A [`JsonFile`] reads and writes a single JSON object keyed by strings.
//! Writes are UTF-8, pretty-printed with four-space indentation and sorted
//! keys. Reads never fail: a missing or malformed file yields an empty
//! mapping and a log entry.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;

use crate::error::JsonFileError;

/// A string-keyed JSON mapping.
pub type JsonMap = BTreeMap<String, Value>;

/// Handle to a JSON file on disk.
///
/// # Examples
///
/// ```
/// use appkeep_common::json_file::JsonFile;
/// use camino::Utf8PathBuf;
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let path = Utf8PathBuf::from_path_buf(dir.path().join("app.json")).expect("UTF-8");
/// let file = JsonFile::new(path);
///
/// file.update_key("save_dir", "/tmp/downloads").expect("write");
/// assert_eq!(file.get("save_dir").and_then(|v| v.as_str().map(str::to_owned)),
///            Some("/tmp/downloads".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFile {
    path: Utf8PathBuf,
}

impl JsonFile {
    /// Create a handle. Nothing is read or written yet.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return true when the file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the whole mapping.
    ///
    /// Returns an empty mapping when the file is missing, unreadable, or
    /// does not hold a JSON object.
    #[must_use]
    pub fn load(&self) -> JsonMap {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("{}: not read: {e}", self.path);
                return JsonMap::new();
            }
        };
        match serde_json::from_str::<JsonMap>(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!("{}: ignoring malformed JSON: {e}", self.path);
                JsonMap::new()
            }
        }
    }

    /// Replace the file contents with `map`.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`JsonFileError`] if serialization or the write fails.
    pub fn save(&self, map: &JsonMap) -> Result<(), JsonFileError> {
        let rendered = render_pretty(map).map_err(|source| JsonFileError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        fs::write(&self.path, rendered).map_err(|source| self.io_error(source))
    }

    /// Insert or replace one key, keeping the rest of the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`JsonFileError`] if the updated mapping cannot be written.
    pub fn update_key(&self, key: &str, value: impl Into<Value>) -> Result<(), JsonFileError> {
        let mut map = self.load();
        map.insert(key.to_owned(), value.into());
        self.save(&map)
    }

    /// Look up one key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.load().remove(key)
    }

    /// Return true when `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.load().contains_key(key)
    }

    fn io_error(&self, source: std::io::Error) -> JsonFileError {
        JsonFileError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn render_pretty(map: &JsonMap) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    map.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}
