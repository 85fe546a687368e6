//! Webhook handler: the pipeline state machine and its HTTP surface.
//!
//! One inbound event drives one strictly sequential pass:
//!
//! ```text
//! Received ─▶ TextExtracted ─▶ Classified ─▶ NotRelevant (terminal)
//!                                   │
//!                                   ▼
//!            ImagesRendered ─▶ FinancialDataExtracted ─▶ ReportRendered
//!                                   │
//!                                   ▼
//!                              Uploaded ─▶ RecordUpdated (terminal)
//! ```
//!
//! with an Error terminal reachable from every state. Every stage is an
//! injected adapter ([`PipelineStages`]), so the whole machine runs against
//! deterministic fakes in tests; no state is re-entered and nothing mutable
//! is shared between concurrent invocations.
//!
//! The HTTP handler is the single point converting failures: any stage error
//! becomes a best-effort `error` record update (secondary failures logged
//! and swallowed) plus a uniform 500 response. Graceful outcomes, success
//! and "not relevant", answer 200. The caller is an external webhook
//! dispatcher; nothing may escape unhandled.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::model::{
    filter_pages, ExtractedText, PageSnapshot, PipelineOutcome, RecordStatus,
};
use crate::pipeline::classify::{LlmPageClassifier, PageClassifier};
use crate::pipeline::extract::{FinancialExtractor, LlmFinancialExtractor};
use crate::pipeline::report;
use crate::pipeline::{snapshot, text};
use crate::storage::{RecordStore, ReportStore, SupabaseClient};
use actix_web::{get, post, web, HttpResponse, Responder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ── PDF gateway ──────────────────────────────────────────────────────────

/// The PDF-shaped boundary of the pipeline: text extraction and page
/// snapshots. A trait for the same reason the LLM stages are traits; the
/// state machine must be drivable by fakes.
#[async_trait]
pub trait PdfGateway: Send + Sync {
    async fn extract_text(&self, url: &str) -> Result<ExtractedText, PipelineError>;

    async fn render_snapshots(
        &self,
        url: &str,
        page_numbers: &[u32],
    ) -> Result<Vec<PageSnapshot>, PipelineError>;
}

/// Production gateway: reqwest download + pdfium, per [`crate::pipeline`].
pub struct PdfiumGateway {
    client: reqwest::Client,
    config: Arc<AppConfig>,
}

impl PdfiumGateway {
    pub fn new(client: reqwest::Client, config: Arc<AppConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PdfGateway for PdfiumGateway {
    async fn extract_text(&self, url: &str) -> Result<ExtractedText, PipelineError> {
        text::extract_report_text(&self.client, url, &self.config).await
    }

    async fn render_snapshots(
        &self,
        url: &str,
        page_numbers: &[u32],
    ) -> Result<Vec<PageSnapshot>, PipelineError> {
        snapshot::render_page_snapshots(&self.client, url, page_numbers, &self.config).await
    }
}

// ── Stage bundle ─────────────────────────────────────────────────────────

/// The injected stage adapters one webhook invocation runs against.
pub struct PipelineStages {
    pub gateway: Arc<dyn PdfGateway>,
    pub classifier: Arc<dyn PageClassifier>,
    pub extractor: Arc<dyn FinancialExtractor>,
    pub reports: Arc<dyn ReportStore>,
    pub records: Arc<dyn RecordStore>,
}

impl PipelineStages {
    /// Wire up the production adapters: pdfium gateway, LLM classifier and
    /// extractor sharing one resolved provider, Supabase for storage and
    /// records.
    pub fn production(config: Arc<AppConfig>) -> Result<Self, PipelineError> {
        let provider = config.resolve_provider()?;
        let supabase = Arc::new(SupabaseClient::new(&config));

        Ok(Self {
            gateway: Arc::new(PdfiumGateway::new(reqwest::Client::new(), Arc::clone(&config))),
            classifier: Arc::new(LlmPageClassifier::new(Arc::clone(&provider), &config)),
            extractor: Arc::new(LlmFinancialExtractor::new(provider, &config)),
            reports: supabase.clone(),
            records: supabase,
        })
    }
}

// ── State machine ────────────────────────────────────────────────────────

/// Run the full extraction pipeline for one report URL.
///
/// Record updates are *not* performed here; the HTTP handler owns the
/// terminal record write so that best-effort semantics live in exactly one
/// place.
pub async fn run_report_pipeline(
    stages: &PipelineStages,
    report_url: &str,
) -> Result<PipelineOutcome, PipelineError> {
    let extracted = stages.gateway.extract_text(report_url).await?;
    if !extracted.success {
        return Ok(PipelineOutcome::NoText {
            message: extracted.message,
        });
    }

    let classification = stages.classifier.classify(&extracted.pages).await?;
    if !classification.is_relevant() {
        return Ok(PipelineOutcome::NotRelevant);
    }

    let snapshots = stages
        .gateway
        .render_snapshots(report_url, &classification.page_numbers)
        .await?;

    let statement_pages = filter_pages(&extracted.pages, &classification.page_numbers);

    let document = stages
        .extractor
        .extract(&snapshots, &statement_pages)
        .await?;

    let workdir = tempfile::TempDir::new()
        .map_err(|e| PipelineError::Internal(format!("temp dir: {e}")))?;
    let report_path = workdir.path().join("pnl-report.pdf");
    report::render_report(&document, &report_path, &classification.company_name)?;

    let public_url = stages.reports.store_report(&report_path).await?;

    Ok(PipelineOutcome::Success {
        report_url: public_url,
    })
}

// ── HTTP surface ─────────────────────────────────────────────────────────

/// Inbound webhook payload. Only the fields the pipeline needs are modeled;
/// the dispatcher sends more.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub record: WebhookRecord,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRecord {
    pub id: String,
    pub cse_report: String,
}

/// Uniform response body: `{"status": ..., "message": ...}`.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub message: String,
}

impl WebhookResponse {
    fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Write the terminal status to the record, logging and swallowing any
/// failure; the primary pipeline result already determines the HTTP
/// response.
async fn update_record_best_effort(
    records: &dyn RecordStore,
    record_id: &str,
    status: RecordStatus,
    report_url: Option<&str>,
) {
    if let Err(e) = records.update_record(record_id, status, report_url).await {
        error!("Failed to update record status: {}", e);
    }
}

/// Process an inbound CSE report event.
#[post("/webhook")]
pub async fn process_report(
    stages: web::Data<PipelineStages>,
    payload: web::Json<WebhookPayload>,
) -> impl Responder {
    let record_id = payload.record.id.as_str();
    let report_url = payload.record.cse_report.as_str();

    info!("Processing CSE report for record ID: {}", record_id);

    match run_report_pipeline(&stages, report_url).await {
        Ok(PipelineOutcome::Success { report_url: public_url }) => {
            update_record_best_effort(
                stages.records.as_ref(),
                record_id,
                RecordStatus::Success,
                Some(&public_url),
            )
            .await;
            HttpResponse::Ok().json(WebhookResponse::new(
                "success",
                "PnL report generated successfully",
            ))
        }
        Ok(PipelineOutcome::NotRelevant) => {
            info!("No relevant pages found for record ID: {}", record_id);
            update_record_best_effort(stages.records.as_ref(), record_id, RecordStatus::Error, None)
                .await;
            HttpResponse::Ok().json(WebhookResponse::new("not_relevant", "No relevant pages found"))
        }
        Ok(PipelineOutcome::NoText { message }) => {
            error!("Cannot proceed for record {}: {}", record_id, message);
            update_record_best_effort(stages.records.as_ref(), record_id, RecordStatus::Error, None)
                .await;
            HttpResponse::InternalServerError().json(WebhookResponse::new("error", message))
        }
        Err(e) => {
            error!("Error processing webhook for record {}: {}", record_id, e);
            update_record_best_effort(stages.records.as_ref(), record_id, RecordStatus::Error, None)
                .await;
            HttpResponse::InternalServerError().json(WebhookResponse::new(
                "error",
                "Failed to process report",
            ))
        }
    }
}

/// Liveness probe for the deployment environment.
#[get("/healthz")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register the webhook routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(process_report).service(health);
}
