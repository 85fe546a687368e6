//! PDF download: fetch a report URL into a managed temp file.
//!
//! ## Why download to a temp file?
//!
//! pdfium needs a file-system path — it cannot stream from a byte buffer.
//! Downloading into a `TempDir` gives us a path pdfium can open while
//! ensuring cleanup happens automatically when [`DownloadedPdf`] is dropped,
//! even if the request handler panics. The `%PDF` magic bytes are validated
//! before returning so callers get [`PipelineError::NotAPdf`] rather than a
//! pdfium parse error when a portal serves an HTML error page with a 200.

use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A downloaded report PDF. The `TempDir` is kept alive so the file
/// survives until the caller is done with it.
#[derive(Debug)]
pub struct DownloadedPdf {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl DownloadedPdf {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Check that the input string looks like an HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Download `url` into a temp directory, validating status and magic bytes.
///
/// Timeouts map to [`PipelineError::DownloadTimeout`]; every other network
/// or HTTP failure maps to [`PipelineError::DownloadFailed`]. Both are
/// distinct from the parse errors the later pdfium stages produce.
pub async fn download_pdf(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<DownloadedPdf, PipelineError> {
    if !is_url(url) {
        return Err(PipelineError::DownloadFailed {
            url: url.to_string(),
            reason: "not an HTTP/HTTPS URL".to_string(),
        });
    }

    info!("Downloading report PDF from: {}", url);

    let response = client
        .get(url)
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                PipelineError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                PipelineError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

    if !response.status().is_success() {
        return Err(PipelineError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            PipelineError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PipelineError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(PipelineError::NotAPdf {
            url: url.to_string(),
            magic,
        });
    }

    let temp_dir = TempDir::new().map_err(|e| PipelineError::Internal(e.to_string()))?;
    let path = temp_dir.path().join("report.pdf");

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| PipelineError::Internal(format!("Failed to write temp file: {e}")))?;

    debug!("Downloaded {} bytes to {}", bytes.len(), path.display());

    Ok(DownloadedPdf {
        path,
        _temp_dir: temp_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://cdn.cse.lk/report.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("report.pdf"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn non_url_input_is_a_download_failure() {
        let client = reqwest::Client::new();
        let err = download_pdf(&client, "not-a-url", 5).await.unwrap_err();
        assert!(err.is_download_error());
    }
}
