//! Per-page text extraction from the downloaded report.
//!
//! Runs pdfium inside `spawn_blocking`: the pdfium C++ library keeps
//! thread-local state and must not run on Tokio worker threads.
//!
//! The outcome contract is two-level. Download and parse
//! problems are `Err` values with distinct variants; a syntactically fine
//! PDF where *no* page yields text (scanned filings are common) is an
//! `Ok(ExtractedText { success: false, .. })`. Callers check the flag and
//! decide, they do not catch.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::model::{ExtractedText, Page};
use crate::pipeline::fetch;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Download `url` and extract the text of every text-bearing page,
/// 1-based and in ascending page order.
pub async fn extract_report_text(
    client: &reqwest::Client,
    url: &str,
    config: &AppConfig,
) -> Result<ExtractedText, PipelineError> {
    let downloaded = fetch::download_pdf(client, url, config.download_timeout_secs).await?;
    let path = downloaded.path().to_path_buf();

    // `downloaded` stays alive across the await, keeping the temp file on disk
    // while the blocking task reads it.
    tokio::task::spawn_blocking(move || extract_text_blocking(&path))
        .await
        .map_err(|e| PipelineError::Internal(format!("Text extraction task panicked: {e}")))?
}

fn extract_text_blocking(pdf_path: &Path) -> Result<ExtractedText, PipelineError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| PipelineError::CorruptPdf {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;

    let mut extracted: Vec<Page> = Vec::new();

    for index in 0..total_pages {
        let page = pages
            .get(index as u16)
            .map_err(|e| PipelineError::CorruptPdf {
                detail: format!("page {}: {:?}", index + 1, e),
            })?;

        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                // No text layer on this page; treated the same as empty text.
                warn!("No text object on page {}: {:?}", index + 1, e);
                continue;
            }
        };

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            extracted.push(Page {
                page_number: index as u32 + 1,
                content: trimmed.to_string(),
            });
        }
    }

    if extracted.is_empty() {
        info!("No text content found in PDF ({} pages)", total_pages);
        return Ok(ExtractedText::no_text());
    }

    info!(
        "Extracted text from {}/{} pages",
        extracted.len(),
        total_pages
    );
    Ok(ExtractedText::complete(extracted))
}
