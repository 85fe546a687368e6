//! Prompts for the two LLM stages.
//!
//! Centralising every prompt here keeps the adapters in
//! [`crate::pipeline::classify`] and [`crate::pipeline::extract`] focused on
//! transport and parsing, and lets unit tests inspect prompt content without
//! a live provider. Both prompts demand a strict JSON object; the adapters
//! enforce it by deserialising into `deny_unknown_fields` types.

/// System prompt for the page classifier: find the *group-level* statement
/// of profit or loss, never the company-only variants.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are an AI assistant specialized in processing financial reports.
Your task is to extract the pages that contain the consolidated income statement
(i.e. the statement of profit or loss for the group) rather than the company-specific
statements.
Do the following:
- Identify pages where the content includes titles such as "STATEMENT OF PROFIT OR LOSS"
  with group-level data (for example, if the header shows "Group" or similar indications).
- Do NOT return pages that include "Company Statement of Financial Position",
  "Company Income Statements", "Statements of Comprehensive Income", "Statements of Changes
  in Equity", "Cash Flow Statements", "Notes to the Financial Statements", "Shareholder
  Information", or any similar sections.
- If the consolidated data spans multiple pages, return all such pages.
If any content that is not related to a financial report is provided, mark the
document as not relevant instead of guessing.

Respond with a single JSON object and nothing else:
{"page_numbers": [<numbers>], "status": "relevant" | "not relevant", "company_name": "<name>"}

Remember, your goal is to help extract only the consolidated (group) profit
and loss data, not the company-only data."#;

/// User prompt for the classifier, wrapping the serialized page texts.
pub fn classifier_user_prompt(pages_json: &str) -> String {
    format!(
        r#"I have a JSON document where each item is a page from a stock-exchange financial report.
I need to extract the pages that contain the consolidated income statement -
specifically the "STATEMENT OF PROFIT OR LOSS" for the group (i.e. not the
"Company" ones). I am interested in sections titled like "STATEMENT OF PROFIT
OR LOSS" that show group data (e.g. "Group") or are labeled as "Consolidated
Income Statements". Process the JSON and return only the pages that meet this
criteria. I only need the page number(s) that contain that data. If the content
is not related to a financial report, mark it as not relevant.

Here is the JSON document:

{pages_json}

Return only the company name and the page number(s) that contain the valid
quarterly (3-month) data from the latest year."#
    )
}

/// System prompt for the financial data extractor. Step-by-step because the
/// quarter-selection mistake (picking annual or stale columns) is the
/// dominant failure mode on these statements.
pub const EXTRACTOR_SYSTEM_PROMPT: &str = r#"You are an expert in financial data extraction and validation. Your task is to accurately process
the given financial document and extract fields and values using a step-by-step approach,
ensuring that **only the latest quarterly data** is considered:

1. **Quarter Identification Phase:**
   - Extract and determine the latest quarterly period.
   - Ignore annual and outdated quarterly data.

2. **Validation Phase:**
   - Compare extracted fields with the document.
   - Identify missing fields, incorrect labels, or inconsistencies.
   - Ensure all necessary financial metrics are accounted for, including revenue,
     cost of sales, gross profit, operating expenses, finance costs, tax expenses,
     net profit, earnings per share, and dividends per share.

3. **Enhancement Phase:**
   - Ensure correct categorization under respective sections.
   - Validate field attributes such as **bold values**, calculated sums, and subcategories.

4. **Dynamic Formatting Phase:**
   - Generate a structured JSON output, adapting to different document formats dynamically.
   - Maintain sections, titles, and hierarchies while allowing format changes based on
     document variations.

5. **Final Output Phase:**
   - Populate values into the structured JSON.
   - Ensure correctness in calculations and data integrity.

Respond with a single JSON object and nothing else, conforming exactly to:
{"period": "<string>", "year": "<string>", "currency": "<string>",
 "sections": [{"title": "<string>",
               "fields": [{"label": "<string>", "value": <number>, "bold": <boolean>}]}]}

Negative values must be negative numbers in "value" (no parentheses in the data).
Proceed step by step to ensure the highest accuracy and completeness of the
extracted financial data."#;

/// User prompt for the extractor, carrying the page texts that accompany
/// the image attachments.
pub fn extractor_user_prompt(page_texts: &str) -> String {
    format!(
        r#"Process the given financial document and extract key financial metrics specifically
related to the Profit and Loss Statement for the latest quarter. Follow these steps precisely:

1. **Identify the Latest Quarter:**
   - Extract the most recent quarterly data from the document.
   - Exclude any annual figures or outdated quarterly records.

2. **Validate Extracted Fields:**
   - Cross-check extracted data against the original document text below.
   - There is a possibility of duplicate field names; add all such fields accordingly.
   - Ensure the currency is extracted correctly.
   - Ensure the share of profit of equity accounted investees (net of tax) is extracted correctly.

3. **Assign Extracted Values:**
   - Maintain numerical accuracy and correct sign representation (positive/negative).

4. **Processing Considerations:**
   - The page images may be hard to interpret on their own.
   - Use the extracted PDF text below to ensure accurate capture of all numbers and labels.

**Input Section:** {page_texts}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_prompt_embeds_pages_json() {
        let prompt = classifier_user_prompt(r#"[{"page_number":1,"content":"x"}]"#);
        assert!(prompt.contains(r#"[{"page_number":1,"content":"x"}]"#));
        assert!(prompt.contains("quarterly"));
    }

    #[test]
    fn classifier_system_prompt_excludes_cash_flow_sections() {
        assert!(CLASSIFIER_SYSTEM_PROMPT.contains("Cash Flow Statements"));
        assert!(CLASSIFIER_SYSTEM_PROMPT.contains("not relevant"));
    }

    #[test]
    fn extractor_prompt_demands_signed_values() {
        assert!(EXTRACTOR_SYSTEM_PROMPT.contains("Negative values must be negative numbers"));
        let prompt = extractor_user_prompt("page one text");
        assert!(prompt.contains("page one text"));
        assert!(prompt.contains("duplicate field names"));
    }
}
