//! Artefact transfer over HTTP.
//!
//! [`Downloader`] is the transfer seam used by packages; tests substitute
//! stubs or a local fixture server. [`HttpDownloader`] streams the response
//! body straight to disk behind an indicatif progress bar.

use camino::Utf8Path;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::sync::OnceLock;
use std::time::Duration;

/// Connection timeout for artefact downloads. Body transfer is unbounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}";

/// Trait for transferring a remote artefact to a local file.
#[cfg_attr(test, mockall::automock)]
pub trait Downloader {
    /// Fetch `url` and write the body to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the request fails or the file cannot be
    /// written. A partially written `dest` may remain; callers clean up.
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError>;
}

/// Errors arising from artefact transfer.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artefact was not found (HTTP 404).
    #[error("artefact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP downloader using `ureq`.
///
/// # Examples
///
/// ```no_run
/// use appkeep_installer::download::{Downloader, HttpDownloader};
/// use camino::Utf8Path;
///
/// let downloader = HttpDownloader::new(false);
/// downloader.fetch("https://example.com/app.tar.xz", Utf8Path::new("/tmp/app.tar.xz"))?;
/// # Ok::<(), appkeep_installer::download::DownloadError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader {
    quiet: bool,
}

impl HttpDownloader {
    /// Create a downloader. `quiet` hides the progress bar.
    #[must_use]
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn progress_bar(&self, total: Option<u64>, dest: &Utf8Path) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let bar = total.map_or_else(ProgressBar::new_spinner, ProgressBar::new);
        if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(dest.file_name().unwrap_or(dest.as_str()).to_owned());
        bar
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError> {
        debug!("GET {url}");
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let total = response
            .headers()
            .get(ureq::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let bar = self.progress_bar(total, dest);
        let mut body = response.into_body();
        let mut reader = bar.wrap_read(body.as_reader());
        let mut file = std::fs::File::create(dest)?;
        let written = std::io::copy(&mut reader, &mut file)?;
        bar.finish_and_clear();
        debug!("wrote {written} bytes to {dest}");
        Ok(())
    }
}

/// Shared `ureq` agent with connection timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(404, true)]
    #[case::server_error(500, false)]
    #[case::forbidden(403, false)]
    fn map_ureq_error_classifies_status(#[case] status: u16, #[case] is_not_found: bool) {
        let mapped = map_ureq_error("https://example.test/pkg", &ureq::Error::StatusCode(status));
        assert_eq!(
            matches!(mapped, DownloadError::NotFound { .. }),
            is_not_found
        );
    }

    #[test]
    fn http_error_message_includes_url() {
        let mapped = map_ureq_error(
            "https://example.test/pkg",
            &ureq::Error::StatusCode(503),
        );
        assert!(mapped.to_string().contains("https://example.test/pkg"));
    }

    #[test]
    fn quiet_downloader_hides_progress() {
        let bar = HttpDownloader::new(true).progress_bar(Some(10), Utf8Path::new("/tmp/a.zip"));
        assert!(bar.is_hidden());
    }
}
