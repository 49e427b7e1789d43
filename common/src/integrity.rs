//! Content digests for artefact verification.
//!
//! [`IntegrityChecker`] computes MD5, SHA-1, SHA-256 or SHA-512 digests over
//! in-memory bytes, a string, or a file. File contents are read once and
//! cached so that several digest kinds can be checked without re-reading a
//! large artefact.
//!
//! Verification fails closed: an expected digest of the wrong length is a
//! mismatch, not an input error.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use md5::Md5;
use once_cell::unsync::OnceCell;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    /// MD5, 32 hex characters.
    Md5,
    /// SHA-1, 40 hex characters.
    Sha1,
    /// SHA-256, 64 hex characters.
    Sha256,
    /// SHA-512, 128 hex characters.
    Sha512,
}

impl DigestKind {
    /// Length of the lowercase hex encoding of this digest.
    ///
    /// # Examples
    ///
    /// ```
    /// use appkeep_common::integrity::DigestKind;
    ///
    /// assert_eq!(DigestKind::Sha256.hex_len(), 64);
    /// ```
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    fn compute(self, data: &[u8]) -> String {
        match self {
            Self::Md5 => format!("{:x}", Md5::digest(data)),
            Self::Sha1 => format!("{:x}", Sha1::digest(data)),
            Self::Sha256 => format!("{:x}", Sha256::digest(data)),
            Self::Sha512 => format!("{:x}", Sha512::digest(data)),
        }
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestKind {
    type Err = IntegrityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(IntegrityError::UnknownAlgorithm {
                name: value.to_owned(),
            }),
        }
    }
}

/// Reasons a digest could not be computed or did not match.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// The expected digest does not have the length of `kind`.
    #[error("expected {kind} digest must be {expected} hex characters, got {actual}")]
    LengthMismatch {
        /// The digest algorithm.
        kind: DigestKind,
        /// Canonical hex length for the algorithm.
        expected: usize,
        /// Length of the supplied digest.
        actual: usize,
    },

    /// The computed digest differs from the expected one.
    #[error("{kind} mismatch: expected {expected}, actual {actual}")]
    Mismatch {
        /// The digest algorithm.
        kind: DigestKind,
        /// The expected digest.
        expected: String,
        /// The computed digest.
        actual: String,
    },

    /// The source file could not be read.
    #[error("failed to read {path}")]
    Io {
        /// The file being digested.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The algorithm name is not recognised.
    #[error("unknown digest algorithm \"{name}\"; expected md5, sha1, sha256 or sha512")]
    UnknownAlgorithm {
        /// The rejected name.
        name: String,
    },
}

enum Source {
    Bytes(Vec<u8>),
    Text(String),
    File(Utf8PathBuf),
}

/// Digest calculator bound to one piece of content.
///
/// # Examples
///
/// ```
/// use appkeep_common::integrity::{DigestKind, IntegrityChecker};
///
/// let checker = IntegrityChecker::from_text("hello");
/// let digest = checker.digest(DigestKind::Sha256).expect("in-memory");
/// assert!(checker.check(DigestKind::Sha256, &digest));
/// assert!(!checker.check(DigestKind::Sha256, &digest[1..]));
/// ```
pub struct IntegrityChecker {
    source: Source,
    file_bytes: OnceCell<Vec<u8>>,
}

impl IntegrityChecker {
    fn new(source: Source) -> Self {
        Self {
            source,
            file_bytes: OnceCell::new(),
        }
    }

    /// Digest raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Source::Bytes(bytes.into()))
    }

    /// Digest the UTF-8 encoding of a string.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Source::Text(text.into()))
    }

    /// Digest the contents of a file, read on first use.
    #[must_use]
    pub fn from_file(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new(Source::File(path.into()))
    }

    fn content(&self) -> Result<&[u8], IntegrityError> {
        match &self.source {
            Source::Bytes(bytes) => Ok(bytes),
            Source::Text(text) => Ok(text.as_bytes()),
            Source::File(path) => self
                .file_bytes
                .get_or_try_init(|| read_file(path))
                .map(Vec::as_slice),
        }
    }

    /// Compute the lowercase hex digest of the content.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::Io`] if the source file cannot be read.
    pub fn digest(&self, kind: DigestKind) -> Result<String, IntegrityError> {
        Ok(kind.compute(self.content()?))
    }

    /// Compare the content's digest against `expected`.
    ///
    /// The expected string's length is validated first; comparison is an
    /// exact, case-sensitive string match against the lowercase digest.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::LengthMismatch`] for a malformed expected
    /// digest, [`IntegrityError::Mismatch`] when the digests differ and
    /// [`IntegrityError::Io`] when the file cannot be read.
    pub fn verify(&self, kind: DigestKind, expected: &str) -> Result<(), IntegrityError> {
        if expected.len() != kind.hex_len() {
            return Err(IntegrityError::LengthMismatch {
                kind,
                expected: kind.hex_len(),
                actual: expected.len(),
            });
        }
        let actual = self.digest(kind)?;
        if actual != expected {
            return Err(IntegrityError::Mismatch {
                kind,
                expected: expected.to_owned(),
                actual,
            });
        }
        Ok(())
    }

    /// Return true when the content matches `expected`.
    ///
    /// Never fails: every error from [`verify`](Self::verify) counts as a
    /// failed check.
    #[must_use]
    pub fn check(&self, kind: DigestKind, expected: &str) -> bool {
        match self.verify(kind, expected) {
            Ok(()) => true,
            Err(e) => {
                debug!("integrity check failed: {e}");
                false
            }
        }
    }
}

impl fmt::Debug for IntegrityChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Bytes(bytes) => format!("{} bytes", bytes.len()),
            Source::Text(text) => format!("{} chars of text", text.chars().count()),
            Source::File(path) => path.to_string(),
        };
        f.debug_struct("IntegrityChecker")
            .field("source", &source)
            .field("cached", &self.file_bytes.get().is_some())
            .finish()
    }
}

fn read_file(path: &Utf8Path) -> Result<Vec<u8>, IntegrityError> {
    debug!("reading {path} for digest computation");
    std::fs::read(path).map_err(|source| IntegrityError::Io {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ABC_MD5: &str = "900150983cd24fb0d6963f7d28e17f72";
    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    const ABC_SHA512: &str = concat!(
        "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a",
        "2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
    );

    #[rstest]
    #[case(DigestKind::Md5, ABC_MD5)]
    #[case(DigestKind::Sha1, ABC_SHA1)]
    #[case(DigestKind::Sha256, ABC_SHA256)]
    #[case(DigestKind::Sha512, ABC_SHA512)]
    fn known_answer_digests(#[case] kind: DigestKind, #[case] expected: &str) {
        let checker = IntegrityChecker::from_text("abc");
        assert_eq!(checker.digest(kind).expect("in-memory digest"), expected);
        assert_eq!(expected.len(), kind.hex_len());
        assert!(checker.check(kind, expected));
    }

    #[rstest]
    #[case::one_short(63)]
    #[case::one_long(65)]
    #[case::empty(0)]
    fn wrong_length_fails_without_error(#[case] len: usize) {
        let checker = IntegrityChecker::from_bytes(b"payload".to_vec());
        let expected = "a".repeat(len);
        assert!(!checker.check(DigestKind::Sha256, &expected));
        assert!(matches!(
            checker.verify(DigestKind::Sha256, &expected),
            Err(IntegrityError::LengthMismatch { actual, .. }) if actual == len
        ));
    }

    #[rstest]
    #[case::empty(b"".as_slice())]
    #[case::binary(&[0_u8, 159, 146, 150][..])]
    #[case::text(b"tor-browser".as_slice())]
    fn computed_digest_checks_against_itself(#[case] data: &[u8]) {
        let checker = IntegrityChecker::from_bytes(data.to_vec());
        let digest = checker.digest(DigestKind::Sha256).expect("in-memory digest");
        assert!(checker.check(DigestKind::Sha256, &digest));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let checker = IntegrityChecker::from_text("abc");
        assert!(!checker.check(DigestKind::Sha256, &ABC_SHA256.to_uppercase()));
    }

    #[test]
    fn mismatch_reports_both_digests() {
        let checker = IntegrityChecker::from_text("abc");
        let wrong = "a".repeat(64);
        let err = checker
            .verify(DigestKind::Sha256, &wrong)
            .expect_err("digests differ");
        let msg = err.to_string();
        assert!(msg.contains(&wrong));
        assert!(msg.contains(ABC_SHA256));
    }

    #[test]
    fn file_contents_are_read_once() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("pkg.bin")).expect("UTF-8 path");
        std::fs::write(&path, b"abc").expect("write fixture");

        let checker = IntegrityChecker::from_file(&path);
        assert!(checker.check(DigestKind::Md5, ABC_MD5));

        // The cached bytes survive the file changing underneath.
        std::fs::write(&path, b"changed").expect("rewrite fixture");
        assert!(checker.check(DigestKind::Sha256, ABC_SHA256));
    }

    #[test]
    fn missing_file_fails_closed() {
        let checker = IntegrityChecker::from_file("/nonexistent/appkeep/pkg.bin");
        assert!(!checker.check(DigestKind::Sha256, ABC_SHA256));
        assert!(matches!(
            checker.digest(DigestKind::Sha256),
            Err(IntegrityError::Io { .. })
        ));
    }

    #[rstest]
    #[case("md5", DigestKind::Md5)]
    #[case("SHA1", DigestKind::Sha1)]
    #[case("sha-256", DigestKind::Sha256)]
    #[case("Sha512", DigestKind::Sha512)]
    fn parses_algorithm_names(#[case] name: &str, #[case] expected: DigestKind) {
        assert_eq!(name.parse::<DigestKind>().expect("known name"), expected);
    }

    #[test]
    fn rejects_unknown_algorithm() {
        assert!(matches!(
            "crc32".parse::<DigestKind>(),
            Err(IntegrityError::UnknownAlgorithm { .. })
        ));
    }
}
