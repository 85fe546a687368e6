//! Page snapshots: rasterise the classified pages to base64 JPEG images.
//!
//! ## Why fail-fast on page bounds?
//!
//! The classifier's page numbers are taken on trust until this stage, which
//! is the first to know the document's real page count. A partial image set
//! would silently change what the financial extractor sees, so one
//! out-of-range page fails the whole call with no partial results.
//!
//! ## Why JPEG?
//!
//! Snapshots are rendered at high DPI (default 800) so the vision model can
//! read dense numeric tables; at that resolution a lossless PNG of an A4
//! page runs to tens of megabytes. JPEG keeps request bodies manageable, and
//! the extractor cross-validates every number against the extracted text
//! anyway.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::model::PageSnapshot;
use crate::pipeline::fetch;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Download the report again and rasterise the requested 1-based pages.
///
/// Returns snapshots in the requested order. Any page outside
/// `[1, total_pages]` fails the entire call with
/// [`PipelineError::PageOutOfRange`].
pub async fn render_page_snapshots(
    client: &reqwest::Client,
    url: &str,
    page_numbers: &[u32],
    config: &AppConfig,
) -> Result<Vec<PageSnapshot>, PipelineError> {
    if page_numbers.is_empty() {
        return Err(PipelineError::Internal(
            "No target pages provided for snapshot rendering".to_string(),
        ));
    }

    let downloaded = fetch::download_pdf(client, url, config.download_timeout_secs).await?;
    let path = downloaded.path().to_path_buf();
    let numbers = page_numbers.to_vec();
    let dpi = config.snapshot_dpi;
    let max_pixels = config.max_rendered_pixels;

    let rendered =
        tokio::task::spawn_blocking(move || render_snapshots_blocking(&path, &numbers, dpi, max_pixels))
            .await
            .map_err(|e| PipelineError::Internal(format!("Snapshot task panicked: {e}")))??;

    // Diagnostic copies only; never required for correctness.
    if let Some(ref dir) = config.snapshot_dir {
        persist_snapshots(dir, &rendered).await;
    }

    let snapshots = rendered
        .into_iter()
        .map(|(page_number, jpeg)| PageSnapshot {
            page_number,
            data: STANDARD.encode(&jpeg),
        })
        .collect::<Vec<_>>();

    info!("Rendered {} page snapshots", snapshots.len());
    Ok(snapshots)
}

/// Reject any requested page outside `[1, total]`, naming the first offender.
pub fn validate_page_numbers(requested: &[u32], total: u32) -> Result<(), PipelineError> {
    for &page in requested {
        if page < 1 || page > total {
            return Err(PipelineError::PageOutOfRange { page, total });
        }
    }
    Ok(())
}

/// Pixel dimensions for a page at `dpi`, capped so the longest edge never
/// exceeds `max_pixels` (aspect ratio preserved).
pub fn snapshot_dimensions(
    width_pts: f32,
    height_pts: f32,
    dpi: u32,
    max_pixels: u32,
) -> (i32, i32) {
    let mut w = width_pts / 72.0 * dpi as f32;
    let mut h = height_pts / 72.0 * dpi as f32;

    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let scale = max_pixels as f32 / longest;
        w *= scale;
        h *= scale;
    }

    (w.round().max(1.0) as i32, h.round().max(1.0) as i32)
}

fn render_snapshots_blocking(
    pdf_path: &Path,
    page_numbers: &[u32],
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<(u32, Vec<u8>)>, PipelineError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| PipelineError::CorruptPdf {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total = pages.len() as u32;

    validate_page_numbers(page_numbers, total)?;

    let mut results = Vec::with_capacity(page_numbers.len());

    for &page_num in page_numbers {
        let page =
            pages
                .get((page_num - 1) as u16)
                .map_err(|e| PipelineError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{e:?}"),
                })?;

        let (px_w, px_h) =
            snapshot_dimensions(page.width().value, page.height().value, dpi, max_pixels);

        let render_config = PdfRenderConfig::new()
            .set_target_width(px_w)
            .set_maximum_height(px_h);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| PipelineError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{e:?}"),
                })?;

        let jpeg = encode_jpeg(page_num, &bitmap.as_image())?;
        debug!("Rendered page {} → {} bytes JPEG", page_num, jpeg.len());

        results.push((page_num, jpeg));
    }

    Ok(results)
}

/// JPEG-encode a rendered page. pdfium hands back RGBA; JPEG has no alpha
/// channel, so flatten to RGB first.
fn encode_jpeg(page_num: u32, img: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .map_err(|e| PipelineError::SnapshotEncodingFailed {
            page: page_num,
            detail: e.to_string(),
        })?;
    Ok(buf)
}

async fn persist_snapshots(dir: &Path, rendered: &[(u32, Vec<u8>)]) {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!("Could not create snapshot dir {}: {}", dir.display(), e);
        return;
    }
    for (page_num, jpeg) in rendered {
        let path = dir.join(format!("page_{page_num}.jpg"));
        if let Err(e) = tokio::fs::write(&path, jpeg).await {
            tracing::warn!("Could not write snapshot {}: {}", path.display(), e);
        }
    }
}
