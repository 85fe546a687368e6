//! Data model shared across the pipeline stages.
//!
//! The LLM-facing response types ([`Classification`], [`FinancialDocument`])
//! mirror the strict JSON schemas the prompts demand and use
//! `deny_unknown_fields`, so any drift in the model's output surfaces as a
//! [`crate::error::PipelineError::SchemaViolation`] instead of silently
//! passing malformed data downstream.

use serde::{Deserialize, Serialize};

/// One page of extracted report text. 1-based, ordered by `page_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub content: String,
}

/// Result of the text-extraction stage.
///
/// `success == false` with an explanatory `message` is the "no text
/// extracted" outcome (scanned or image-only PDFs): a flagged result, not
/// an error. Hard failures (download, corrupt PDF) are `Err` values instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub success: bool,
    pub message: String,
    pub pages: Vec<Page>,
}

impl ExtractedText {
    /// Successful extraction of at least one text-bearing page.
    pub fn complete(pages: Vec<Page>) -> Self {
        Self {
            success: true,
            message: "PDF text extraction completed successfully".to_string(),
            pages,
        }
    }

    /// No page yielded text after trimming.
    pub fn no_text() -> Self {
        Self {
            success: false,
            message: "No text extracted. PDF may be scanned or contain only images.".to_string(),
            pages: Vec::new(),
        }
    }
}

/// Relevance verdict from the page classifier.
///
/// The serde names match the strings the model is instructed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelevanceStatus {
    #[serde(rename = "relevant")]
    Relevant,
    #[serde(rename = "not relevant")]
    NotRelevant,
}

/// Classifier output: which pages hold the consolidated income statement.
///
/// Page numbers are trusted as returned; bounds are validated when the
/// snapshot stage actually opens the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Classification {
    pub page_numbers: Vec<u32>,
    pub status: RelevanceStatus,
    pub company_name: String,
}

impl Classification {
    pub fn is_relevant(&self) -> bool {
        self.status == RelevanceStatus::Relevant
    }
}

/// A rasterised page, JPEG-compressed and base64-encoded for the
/// multimodal API request. Transient; never persisted past the run.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub page_number: u32,
    pub data: String,
}

/// One labeled figure in a statement section.
///
/// `value` keeps its sign; parenthesised negative display is the report
/// renderer's concern. Duplicate labels within a section are legal and
/// preserved in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    pub label: String,
    pub value: f64,
    pub bold: bool,
}

/// A titled group of fields, in source display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub title: String,
    pub fields: Vec<Field>,
}

/// Normalized financial statement returned by the extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinancialDocument {
    pub period: String,
    pub year: String,
    pub currency: String,
    pub sections: Vec<Section>,
}

/// Terminal status written to the record datastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Success,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Success => "success",
            RecordStatus::Error => "error",
        }
    }
}

/// Terminal states of the webhook pipeline that are not stage failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Report rendered and uploaded; the public URL was written back.
    Success { report_url: String },
    /// The document holds no consolidated income statement. Benign.
    NotRelevant,
    /// Extraction found a readable PDF with no text on any page. Flagged by
    /// the text stage rather than raised; the handler maps it to an error
    /// response because the pipeline cannot proceed.
    NoText { message: String },
}

/// Keep only the pages whose numbers appear in `selected`, preserving the
/// original ascending order. Selection order does not matter; duplicates in
/// `selected` do not duplicate pages.
pub fn filter_pages(pages: &[Page], selected: &[u32]) -> Vec<Page> {
    pages
        .iter()
        .filter(|p| selected.contains(&p.page_number))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32, content: &str) -> Page {
        Page {
            page_number: n,
            content: content.to_string(),
        }
    }

    #[test]
    fn classification_parses_model_output() {
        let raw = r#"{"page_numbers":[3,5],"status":"relevant","company_name":"ABC Corp"}"#;
        let c: Classification = serde_json::from_str(raw).unwrap();
        assert_eq!(c.page_numbers, vec![3, 5]);
        assert!(c.is_relevant());
        assert_eq!(c.company_name, "ABC Corp");
    }

    #[test]
    fn classification_parses_not_relevant() {
        let raw = r#"{"page_numbers":[],"status":"not relevant","company_name":""}"#;
        let c: Classification = serde_json::from_str(raw).unwrap();
        assert!(!c.is_relevant());
    }

    #[test]
    fn classification_rejects_unknown_fields() {
        let raw = r#"{"page_numbers":[1],"status":"relevant","company_name":"X","note":"hi"}"#;
        assert!(serde_json::from_str::<Classification>(raw).is_err());
    }

    #[test]
    fn financial_document_preserves_duplicate_labels_and_sign() {
        let raw = r#"{
            "period": "Three months ended 31 March",
            "year": "2025",
            "currency": "Rs. '000",
            "sections": [{
                "title": "Continuing Operations",
                "fields": [
                    {"label": "Other income", "value": 120.0, "bold": false},
                    {"label": "Other income", "value": -45.5, "bold": false},
                    {"label": "Net Profit", "value": -1250000, "bold": true}
                ]
            }]
        }"#;
        let doc: FinancialDocument = serde_json::from_str(raw).unwrap();
        let fields = &doc.sections[0].fields;
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].label, fields[1].label);
        assert_eq!(fields[2].value, -1_250_000.0);
        assert!(fields[2].bold);
    }

    #[test]
    fn filter_pages_keeps_selected_in_document_order() {
        let pages = vec![page(1, "a"), page(3, "c"), page(5, "e"), page(7, "g")];
        let filtered = filter_pages(&pages, &[5, 3]);
        assert_eq!(
            filtered.iter().map(|p| p.page_number).collect::<Vec<_>>(),
            vec![3, 5]
        );
    }

    #[test]
    fn filter_pages_ignores_numbers_without_pages() {
        let pages = vec![page(1, "a"), page(2, "b")];
        let filtered = filter_pages(&pages, &[2, 9]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].page_number, 2);
    }

    #[test]
    fn record_status_strings() {
        assert_eq!(RecordStatus::Success.as_str(), "success");
        assert_eq!(RecordStatus::Error.as_str(), "error");
    }
}
