//! Pipeline stages for the report extraction flow.
//!
//! Each submodule implements exactly one transformation step, keeping every
//! stage independently testable and the LLM boundary swappable for
//! deterministic fakes.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ text ──▶ classify ──▶ snapshot ──▶ extract ──▶ report
//! (URL)   (pdfium)  (LLM, text)   (pdfium,    (LLM, text   (lopdf)
//!                                  base64)     + images)
//! ```
//!
//! 1. [`fetch`]    — download the report URL to a managed temp file
//! 2. [`text`]     — per-page text extraction; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`classify`] — ask the model which pages hold the consolidated
//!    income statement
//! 4. [`snapshot`] — rasterise exactly those pages to base64 JPEG, with
//!    fail-fast bounds validation
//! 5. [`extract`]  — multimodal call returning the normalized statement
//! 6. [`report`]   — lay the statement out as a paginated PDF

pub mod classify;
pub mod extract;
pub mod fetch;
pub mod report;
pub mod snapshot;
pub mod text;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Strip an outer ``` fence from model output.
///
/// Both prompts demand a bare JSON object, but chat models occasionally wrap
/// it in a fence anyway. Removing the wrapper here keeps the strict serde
/// parse focused on actual schema violations.
pub fn strip_json_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        caps[1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_anonymous_fence() {
        let raw = "```\n{\"a\": 1}\n```\n";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_bare_json_untouched() {
        assert_eq!(strip_json_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
