//! # pnl-extractor
//!
//! Turn a stock-exchange financial report PDF into a rendered profit-and-loss
//! report, triggered by a webhook.
//!
//! ## Why this shape?
//!
//! Quarterly CSE filings bury the consolidated (group) income statement
//! between company-only statements, equity-change schedules, and pages of
//! notes. Plain text extraction cannot tell them apart, and vision-only
//! reading of dense numeric tables is unreliable. This crate combines both:
//! a text-based LLM pass locates the right pages, then a multimodal pass
//! reads high-DPI snapshots of exactly those pages with the extracted text
//! alongside for cross-validation.
//!
//! ## Pipeline Overview
//!
//! ```text
//! webhook event (record id + report URL)
//!  │
//!  ├─ 1. Fetch      download the PDF to a managed temp file
//!  ├─ 2. Text       per-page extraction via pdfium (spawn_blocking)
//!  ├─ 3. Classify   LLM locates the consolidated income statement pages
//!  │                 └─ "not relevant" ends the run gracefully
//!  ├─ 4. Snapshot   rasterise those pages → base64 JPEG (fail-fast bounds)
//!  ├─ 5. Extract    multimodal LLM → normalized FinancialDocument
//!  ├─ 6. Report     styled, paginated P&L PDF via lopdf
//!  └─ 7. Store      upload under a fresh UUID, update the record
//! ```
//!
//! Every stage with an external effect is an injected adapter
//! ([`webhook::PipelineStages`]), so the state machine runs unchanged
//! against deterministic fakes in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pnl_extractor::{AppConfig, PipelineStages, run_report_pipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(AppConfig::from_env()?);
//!     let stages = PipelineStages::production(config)?;
//!     let outcome = run_report_pipeline(&stages, "https://cdn.cse.lk/report.pdf").await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod storage;
pub mod webhook;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::AppConfig;
pub use error::PipelineError;
pub use model::{
    Classification, ExtractedText, Field, FinancialDocument, Page, PageSnapshot, PipelineOutcome,
    RecordStatus, RelevanceStatus, Section,
};
pub use pipeline::classify::PageClassifier;
pub use pipeline::extract::FinancialExtractor;
pub use storage::{RecordStore, ReportStore, SupabaseClient};
pub use webhook::{run_report_pipeline, PdfGateway, PipelineStages};
