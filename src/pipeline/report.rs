//! P&L report rendering: lay a [`FinancialDocument`] out as a paginated PDF.
//!
//! The output is a styled A4 document: a centred title block (company name,
//! reporting period and year, currency), then one titled block per section
//! containing a two-column ruled table (label on the left, formatted value
//! right-aligned) with bold rows for fields flagged bold.
//!
//! Sign handling is split across layers: the data model stores
//! signed numeric values, and only this presentation layer turns a negative
//! into the accountant's `(1,250,000)` form. See [`format_amount`].
//!
//! The PDF is written with `lopdf` primitives (base-14 Helvetica fonts, raw
//! content streams), so no font files ship with the service. Output is
//! written to a temp name and renamed into place; a failed render never
//! leaves a partial report behind.

use crate::error::PipelineError;
use crate::model::{Field, FinancialDocument};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use tracing::info;

// A4 portrait in PDF points, with the margins the report template uses.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_LEFT: f32 = 30.0;
const MARGIN_TOP: f32 = 50.0;
const MARGIN_BOTTOM: f32 = 30.0;

// Two-column table geometry: 320pt label cell + 120pt value cell.
const LABEL_WIDTH: f32 = 320.0;
const VALUE_WIDTH: f32 = 120.0;
const ROW_HEIGHT: f32 = 18.0;
const CELL_PADDING: f32 = 4.0;

/// Default company name when the classifier returned none.
const PLACEHOLDER_COMPANY: &str = "XYZ Ltd.";

/// Render `document` as a styled P&L report PDF at `path`.
pub fn render_report(
    document: &FinancialDocument,
    path: &Path,
    company_name: &str,
) -> Result<(), PipelineError> {
    let company = if company_name.trim().is_empty() {
        PLACEHOLDER_COMPANY
    } else {
        company_name
    };

    let mut layout = Layout::new();
    layout.title_block(company, document);

    for section in &document.sections {
        layout.section_title(&section.title);
        for (row_index, field) in section.fields.iter().enumerate() {
            layout.table_row(field, row_index);
        }
        layout.spacer(10.0);
    }

    let pages = layout.finish();
    write_pdf(pages, path)?;

    info!(
        "Rendered P&L report for '{}' to {}",
        company,
        path.display()
    );
    Ok(())
}

/// Format a statement amount for display.
///
/// Non-negative values get thousands separators; negative values are the
/// absolute amount in parentheses. Fractional amounts keep two decimals.
pub fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    // Round to cents once so e.g. 999.999 doesn't split into "999.100".
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let body = if frac == 0 {
        group_thousands(whole)
    } else {
        format!("{}.{:02}", group_thousands(whole), frac)
    };

    if negative {
        format!("({body})")
    } else {
        body
    }
}

fn group_thousands(mut n: u64) -> String {
    let mut groups: Vec<String> = Vec::new();
    loop {
        if n < 1000 {
            groups.push(n.to_string());
            break;
        }
        groups.push(format!("{:03}", n % 1000));
        n /= 1000;
    }
    groups.reverse();
    groups.join(",")
}

/// Approximate rendered width of `text` in Helvetica at `size` points.
///
/// Coarse per-glyph classes from the AFM metrics; good enough for
/// right-aligning numeric cells and centring titles, which is all the
/// layout needs.
fn text_width(text: &str, size: f32) -> f32 {
    let units: f32 = text
        .chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '|' | '!' | ';' | ':' => 0.28,
            ' ' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 0.33,
            'm' | 'w' | 'M' | 'W' | '@' => 0.89,
            'A'..='Z' | '&' | '%' => 0.70,
            _ => 0.55,
        })
        .sum();
    units * size
}

// ── Page layout ──────────────────────────────────────────────────────────

/// Accumulates content-stream operations, breaking onto a fresh page when
/// the cursor would pass the bottom margin.
struct Layout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(std::mem::take(&mut self.current));
        self.pages
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN_TOP;
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN_BOTTOM {
            self.break_page();
        }
    }

    fn spacer(&mut self, height: f32) {
        self.y -= height;
    }

    /// Centred title block: company, "{period} {year}", currency.
    fn title_block(&mut self, company: &str, document: &FinancialDocument) {
        self.centred_text(company, "F2", 16.0);
        self.spacer(15.0);

        let report_title = format!("{} {}", document.period, document.year);
        self.centred_text(&report_title, "F2", 16.0);
        self.spacer(6.0);

        self.centred_text(&document.currency, "F2", 12.0);
        self.spacer(10.0);
    }

    fn section_title(&mut self, title: &str) {
        // Keep the title attached to at least the first row of its table.
        self.ensure_room(16.0 + ROW_HEIGHT);
        self.y -= 12.0;
        self.text_at(MARGIN_LEFT, self.y, title, "F2", 10.0);
        self.spacer(9.0);
    }

    fn table_row(&mut self, field: &Field, row_index: usize) {
        self.ensure_room(ROW_HEIGHT);
        let row_bottom = self.y - ROW_HEIGHT;

        // Alternating row backgrounds, then the cell grid.
        let shade = if row_index % 2 == 0 { 0.96 } else { 0.90 };
        self.fill_rect(
            MARGIN_LEFT,
            row_bottom,
            LABEL_WIDTH + VALUE_WIDTH,
            ROW_HEIGHT,
            shade,
        );
        self.stroke_rect(MARGIN_LEFT, row_bottom, LABEL_WIDTH, ROW_HEIGHT);
        self.stroke_rect(MARGIN_LEFT + LABEL_WIDTH, row_bottom, VALUE_WIDTH, ROW_HEIGHT);

        let baseline = row_bottom + 5.0;
        self.text_at(MARGIN_LEFT + CELL_PADDING, baseline, &field.label, "F1", 10.0);

        let value = format_amount(field.value);
        let value_font = if field.bold { "F2" } else { "F1" };
        let value_x = MARGIN_LEFT + LABEL_WIDTH + VALUE_WIDTH
            - CELL_PADDING
            - text_width(&value, 10.0);
        self.text_at(value_x, baseline, &value, value_font, 10.0);

        self.y = row_bottom;
    }

    fn centred_text(&mut self, text: &str, font: &str, size: f32) {
        self.ensure_room(size * 1.2);
        self.y -= size;
        let x = (PAGE_WIDTH - text_width(text, size)) / 2.0;
        self.text_at(x.max(MARGIN_LEFT), self.y, text, font, size);
    }

    fn text_at(&mut self, x: f32, y: f32, text: &str, font: &str, size: f32) {
        self.current.push(Operation::new("BT", vec![]));
        self.current
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.current
            .push(Operation::new("Td", vec![x.into(), y.into()]));
        self.current
            .push(Operation::new("Tj", vec![Object::string_literal(text)]));
        self.current.push(Operation::new("ET", vec![]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, gray: f32) {
        self.current.push(Operation::new("g", vec![gray.into()]));
        self.current.push(Operation::new(
            "re",
            vec![x.into(), y.into(), w.into(), h.into()],
        ));
        self.current.push(Operation::new("f", vec![]));
        // Back to black fill for the row's text.
        self.current.push(Operation::new("g", vec![0.into()]));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.current.push(Operation::new("w", vec![0.5_f32.into()]));
        self.current.push(Operation::new("G", vec![0.83_f32.into()]));
        self.current.push(Operation::new(
            "re",
            vec![x.into(), y.into(), w.into(), h.into()],
        ));
        self.current.push(Operation::new("S", vec![]));
    }
}

// ── PDF assembly ─────────────────────────────────────────────────────────

fn write_pdf(pages: Vec<Vec<Operation>>, path: &Path) -> Result<(), PipelineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    let page_count = pages.len();

    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| PipelineError::ReportRenderFailed {
                detail: format!("content stream encoding: {e}"),
            })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    // Temp-name + rename so a failed save never leaves a partial report.
    let tmp_path = path.with_extension("pdf.tmp");
    doc.save(&tmp_path)
        .map_err(|e| PipelineError::ReportRenderFailed {
            detail: e.to_string(),
        })?;
    std::fs::rename(&tmp_path, path).map_err(|e| PipelineError::ReportRenderFailed {
        detail: format!("rename into place: {e}"),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Section};
    use lopdf::ObjectId;

    /// Decoded content stream of one page, as latin-1 text.
    fn page_content(doc: &Document, page_id: ObjectId) -> String {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let contents = page.get(b"Contents").unwrap();
        String::from_utf8_lossy(&content_data(doc, contents)).into_owned()
    }

    fn content_data(doc: &Document, contents: &Object) -> Vec<u8> {
        match contents {
            Object::Reference(r) => content_data(doc, doc.get_object(*r).unwrap()),
            Object::Stream(stream) => stream.decompressed_content().unwrap(),
            Object::Array(arr) => arr.iter().flat_map(|o| content_data(doc, o)).collect(),
            _ => Vec::new(),
        }
    }

    fn sample_document() -> FinancialDocument {
        FinancialDocument {
            period: "Three months ended 31 March".into(),
            year: "2025".into(),
            currency: "Rs. '000".into(),
            sections: vec![Section {
                title: "Continuing Operations".into(),
                fields: vec![
                    Field {
                        label: "Revenue".into(),
                        value: 980_000.0,
                        bold: false,
                    },
                    Field {
                        label: "Net Profit".into(),
                        value: -1_250_000.0,
                        bold: true,
                    },
                ],
            }],
        }
    }

    #[test]
    fn format_amount_thousands_separators() {
        assert_eq!(format_amount(980_000.0), "980,000");
        assert_eq!(format_amount(1_234_567.0), "1,234,567");
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
    }

    #[test]
    fn format_amount_negative_in_parentheses() {
        assert_eq!(format_amount(-1_250_000.0), "(1,250,000)");
        assert_eq!(format_amount(-3.0), "(3)");
    }

    #[test]
    fn format_amount_keeps_cents() {
        assert_eq!(format_amount(1_234_567.5), "1,234,567.50");
        assert_eq!(format_amount(-0.25), "(0.25)");
    }

    #[test]
    fn render_produces_loadable_pdf_with_formatted_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");

        render_report(&sample_document(), &path, "ABC Corp").unwrap();

        let saved = Document::load(&path).expect("report should be a valid PDF");
        let pages = saved.get_pages();
        assert_eq!(pages.len(), 1);

        let (_, &page_id) = pages.iter().next().unwrap();
        let text = page_content(&saved, page_id);

        assert!(text.contains("980,000"), "positive value formatted");
        assert!(text.contains("1,250,000"), "negative value as absolute");
        assert!(text.contains("/F2"), "bold font selected somewhere");
        assert!(text.contains("ABC Corp"));
    }

    #[test]
    fn empty_company_name_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");

        render_report(&sample_document(), &path, "  ").unwrap();

        let saved = Document::load(&path).unwrap();
        let (_, &page_id) = saved.get_pages().iter().next().unwrap();
        assert!(page_content(&saved, page_id).contains("XYZ Ltd."));
    }

    #[test]
    fn long_statements_paginate() {
        let mut document = sample_document();
        document.sections = (0..12)
            .map(|s| Section {
                title: format!("Section {s}"),
                fields: (0..10)
                    .map(|f| Field {
                        label: format!("Line item {f}"),
                        value: (f as f64 + 1.0) * 1000.0,
                        bold: f == 9,
                    })
                    .collect(),
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.pdf");
        render_report(&document, &path, "Paginated Plc").unwrap();

        let saved = Document::load(&path).unwrap();
        assert!(
            saved.get_pages().len() > 1,
            "120 rows must not fit on one page"
        );
    }

    #[test]
    fn no_partial_file_on_render_failure() {
        let document = sample_document();
        // Target directory does not exist, so the temp-file save must fail.
        let path = Path::new("/nonexistent-dir/report.pdf");
        assert!(render_report(&document, path, "X").is_err());
        assert!(!path.exists());
    }
}
