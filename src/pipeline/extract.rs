//! Financial data extraction: page images + page text → normalized statement.
//!
//! ## Why send both representations?
//!
//! Image-only interpretation of dense numeric tables is unreliable: vision
//! models transpose digits and misread column alignment. Sending the
//! extracted text alongside the snapshots lets the model cross-validate
//! every figure; the prompt says so explicitly. The images still matter:
//! they carry the bold/emphasis formatting and visual section structure the
//! text layer loses.
//!
//! ## Message layout
//!
//! 1. System message — the phased extraction instructions
//! 2. User message — the filtered page texts
//! 3. One user message per page snapshot (image attachment, empty text)
//!
//! Schema enforcement is the serde parse into the `deny_unknown_fields`
//! [`FinancialDocument`]; any violation is a hard failure with no guessed
//! substitute data.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::model::{FinancialDocument, Page, PageSnapshot};
use crate::pipeline::strip_json_fences;
use crate::prompts::{extractor_user_prompt, EXTRACTOR_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extracts the latest-quarter P&L figures from the statement pages.
#[async_trait]
pub trait FinancialExtractor: Send + Sync {
    async fn extract(
        &self,
        snapshots: &[PageSnapshot],
        pages: &[Page],
    ) -> Result<FinancialDocument, PipelineError>;
}

/// Production extractor backed by a multimodal chat-completion provider.
pub struct LlmFinancialExtractor {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmFinancialExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl FinancialExtractor for LlmFinancialExtractor {
    async fn extract(
        &self,
        snapshots: &[PageSnapshot],
        pages: &[Page],
    ) -> Result<FinancialDocument, PipelineError> {
        let start = Instant::now();

        let texts: Vec<&str> = pages.iter().map(|p| p.content.as_str()).collect();
        let texts_json = serde_json::to_string(&texts)
            .map_err(|e| PipelineError::Internal(format!("Failed to serialize page texts: {e}")))?;

        let mut messages = vec![
            ChatMessage::system(EXTRACTOR_SYSTEM_PROMPT),
            ChatMessage::user(extractor_user_prompt(&texts_json)),
        ];

        for snapshot in snapshots {
            messages.push(ChatMessage::user_with_images(
                "",
                vec![ImageData::new(snapshot.data.clone(), "image/jpeg").with_detail("high")],
            ));
        }

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PipelineError::LlmApi {
                stage: "financial extraction",
                message: e.to_string(),
            })?;

        debug!(
            "Extractor call: {} snapshots, {} input tokens, {} output tokens, {:?}",
            snapshots.len(),
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        let document = parse_financial_document(&response.content)?;
        info!(
            "Extracted statement: period '{}' {}, {} sections",
            document.period,
            document.year,
            document.sections.len()
        );

        Ok(document)
    }
}

/// Parse the extractor's strict JSON output into a [`FinancialDocument`].
pub fn parse_financial_document(raw: &str) -> Result<FinancialDocument, PipelineError> {
    let cleaned = strip_json_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| PipelineError::SchemaViolation {
        stage: "financial extraction",
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "period": "Three months ended 31 March",
        "year": "2025",
        "currency": "Rs. '000",
        "sections": [{
            "title": "Continuing Operations",
            "fields": [
                {"label": "Revenue", "value": 4520000, "bold": false},
                {"label": "Cost of Sales", "value": -3100000, "bold": false},
                {"label": "Gross Profit", "value": 1420000, "bold": true}
            ]
        }]
    }"#;

    #[test]
    fn parses_valid_statement() {
        let doc = parse_financial_document(VALID).unwrap();
        assert_eq!(doc.year, "2025");
        assert_eq!(doc.sections[0].fields[1].value, -3_100_000.0);
        assert!(doc.sections[0].fields[2].bold);
    }

    #[test]
    fn parses_fenced_statement() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_financial_document(&fenced).is_ok());
    }

    #[test]
    fn missing_currency_is_a_schema_violation() {
        let raw = r#"{"period":"Q1","year":"2025","sections":[]}"#;
        let err = parse_financial_document(raw).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SchemaViolation {
                stage: "financial extraction",
                ..
            }
        ));
    }

    #[test]
    fn string_value_is_a_schema_violation() {
        let raw = r#"{"period":"Q1","year":"2025","currency":"LKR","sections":[
            {"title":"S","fields":[{"label":"Revenue","value":"(1,250)","bold":false}]}]}"#;
        assert!(parse_financial_document(raw).is_err());
    }
}
