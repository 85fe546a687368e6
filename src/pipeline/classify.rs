//! Page classification: which pages hold the consolidated income statement.
//!
//! The trait exists so the webhook state machine can run against a
//! deterministic fake honoring the same schema contract; the production
//! implementation is a thin adapter over the chat-completion provider. All
//! prompt content lives in [`crate::prompts`].
//!
//! "Not relevant" is a *value*, not an error: a pension-fund circular or a
//! prospectus posted to the same feed classifies as not relevant and the
//! pipeline ends gracefully. Only transport failures and schema violations
//! are `Err`.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::model::{Classification, Page};
use crate::pipeline::strip_json_fences;
use crate::prompts::{classifier_user_prompt, CLASSIFIER_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Locates the consolidated (group) income statement pages.
#[async_trait]
pub trait PageClassifier: Send + Sync {
    async fn classify(&self, pages: &[Page]) -> Result<Classification, PipelineError>;
}

/// Production classifier backed by a chat-completion provider.
pub struct LlmPageClassifier {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmPageClassifier {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl PageClassifier for LlmPageClassifier {
    async fn classify(&self, pages: &[Page]) -> Result<Classification, PipelineError> {
        let start = Instant::now();

        let pages_json = serde_json::to_string(pages)
            .map_err(|e| PipelineError::Internal(format!("Failed to serialize pages: {e}")))?;

        let messages = vec![
            ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
            ChatMessage::user(classifier_user_prompt(&pages_json)),
        ];

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
                stage: "classification",
                message: e.to_string(),
            })?;

        debug!(
            "Classifier call: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        let classification = parse_classification(&response.content)?;
        info!(
            "Classification: {:?}, pages {:?}, company '{}'",
            classification.status, classification.page_numbers, classification.company_name
        );

        Ok(classification)
    }
}

/// Parse the classifier's strict JSON output.
///
/// Any mismatch against the schema (missing fields, wrong status string,
/// extra keys) is a hard [`PipelineError::SchemaViolation`].
pub fn parse_classification(raw: &str) -> Result<Classification, PipelineError> {
    let cleaned = strip_json_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| PipelineError::SchemaViolation {
        stage: "classification",
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelevanceStatus;

    #[test]
    fn parses_relevant_response() {
        let raw = r#"{"page_numbers":[3,5],"status":"relevant","company_name":"ABC Corp"}"#;
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.page_numbers, vec![3, 5]);
        assert_eq!(c.status, RelevanceStatus::Relevant);
    }

    #[test]
    fn parses_fenced_response() {
        let raw = "```json\n{\"page_numbers\":[2],\"status\":\"relevant\",\"company_name\":\"X\"}\n```";
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.page_numbers, vec![2]);
    }

    #[test]
    fn parses_not_relevant_response() {
        let raw = r#"{"page_numbers":[],"status":"not relevant","company_name":""}"#;
        let c = parse_classification(raw).unwrap();
        assert!(!c.is_relevant());
    }

    #[test]
    fn unknown_status_is_a_schema_violation() {
        let raw = r#"{"page_numbers":[1],"status":"maybe","company_name":"X"}"#;
        let err = parse_classification(raw).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SchemaViolation {
                stage: "classification",
                ..
            }
        ));
    }

    #[test]
    fn prose_answer_is_a_schema_violation() {
        let err = parse_classification("The relevant pages are 3 and 5.").unwrap_err();
        assert!(matches!(err, PipelineError::SchemaViolation { .. }));
    }
}
