//! Error types for the pnl-extractor library.
//!
//! Every pipeline stage returns a typed [`PipelineError`]; the webhook
//! handler is the single place that converts a failure into a record-status
//! update plus a uniform HTTP response. Two outcomes do NOT appear here:
//!
//! * A PDF with no extractable text — reported as a flagged
//!   [`crate::model::ExtractedText`] result (`success == false`) so callers
//!   check the flag instead of catching an error.
//! * A "not relevant" classification — a normal value of
//!   [`crate::model::RelevanceStatus`], terminating the pipeline gracefully.
//!
//! Download and parse failures stay distinct variants: a timeout on a flaky
//! mirror and a corrupt byte stream call for different operator responses.

use thiserror::Error;

/// All failures the extraction pipeline can surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Download errors ───────────────────────────────────────────────────
    /// HTTP fetch of the report PDF failed (network or non-2xx status).
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The fetched bytes are not a PDF.
    #[error("Resource at '{url}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { url: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The byte stream carries a PDF header but pdfium cannot parse it.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// A requested 1-based page number exceeds the document's page count.
    ///
    /// The snapshot stage fails the whole call on the first such page; a
    /// partial image set would make the downstream extraction unreliable.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    /// pdfium returned an error while rasterising a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    /// JPEG encoding of a rendered page failed.
    #[error("Snapshot encoding failed for page {page}: {detail}")]
    SnapshotEncodingFailed { page: u32, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The chat-completion API returned an error for the named stage.
    #[error("LLM call failed during {stage}: {message}")]
    LlmApi { stage: &'static str, message: String },

    /// The model's output did not match the stage's strict schema.
    ///
    /// Hard failure: no partial or guessed data is substituted.
    #[error("LLM response for {stage} violates the expected schema: {detail}")]
    SchemaViolation { stage: &'static str, detail: String },

    /// No LLM provider could be resolved from config or environment.
    #[error("LLM provider is not configured: {hint}")]
    ProviderNotConfigured { hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The report PDF could not be produced.
    #[error("Failed to render P&L report: {detail}")]
    ReportRenderFailed { detail: String },

    /// Upload failed, or the storage backend yielded no public URL.
    #[error("Failed to upload report to storage: {detail}")]
    StorageUploadFailed { detail: String },

    /// Keyed status update on the record datastore failed.
    ///
    /// The handler logs and swallows this; it never overrides the primary
    /// pipeline outcome.
    #[error("Failed to update record '{record_id}': {detail}")]
    RecordUpdateFailed { record_id: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Required configuration was missing or malformed at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// `true` for the variants the download stage produces, as opposed to
    /// PDF parse failures. The webhook response message distinguishes the
    /// two.
    pub fn is_download_error(&self) -> bool {
        matches!(
            self,
            PipelineError::DownloadFailed { .. }
                | PipelineError::DownloadTimeout { .. }
                | PipelineError::NotAPdf { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = PipelineError::PageOutOfRange { page: 9, total: 4 };
        let msg = e.to_string();
        assert!(msg.contains("Page 9"), "got: {msg}");
        assert!(msg.contains("4 pages"), "got: {msg}");
    }

    #[test]
    fn schema_violation_names_stage() {
        let e = PipelineError::SchemaViolation {
            stage: "classification",
            detail: "missing field `status`".into(),
        };
        assert!(e.to_string().contains("classification"));
    }

    #[test]
    fn download_errors_are_distinct_from_parse_errors() {
        let download = PipelineError::DownloadFailed {
            url: "https://example.com/r.pdf".into(),
            reason: "connection refused".into(),
        };
        let parse = PipelineError::CorruptPdf {
            detail: "bad xref".into(),
        };
        assert!(download.is_download_error());
        assert!(!parse.is_download_error());
    }

    #[test]
    fn not_a_pdf_is_a_download_stage_error() {
        let e = PipelineError::NotAPdf {
            url: "https://example.com/page".into(),
            magic: *b"<htm",
        };
        assert!(e.is_download_error());
        assert!(e.to_string().contains("not a valid PDF"));
    }
}
