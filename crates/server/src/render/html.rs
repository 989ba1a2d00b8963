//! Printable HTML production report.
//!
//! The template carries `@page` rules for A4 portrait output, so the document
//! can be printed or converted to PDF by any browser.

use askama::Template;
use lotwise_core::{BatchGroup, MaterialLine, ReportData, RunBlock};

use super::{RenderError, RenderedDocument, Renderer, SheetHeader};

/// Renders the production control report as HTML.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    header: SheetHeader,
}

impl HtmlRenderer {
    /// Create a renderer printing `header` on every sheet.
    #[must_use]
    pub const fn new(header: SheetHeader) -> Self {
        Self { header }
    }
}

impl Renderer for HtmlRenderer {
    fn name(&self) -> &'static str {
        "html"
    }

    fn render(&self, report: &ReportData) -> Result<RenderedDocument, RenderError> {
        let html = ProductionReportTemplate::new(report, &self.header).render()?;
        Ok(RenderedDocument {
            bytes: html.into_bytes(),
            content_type: "text/html; charset=utf-8",
            extension: "html",
        })
    }
}

/// Production report page template.
#[derive(Template)]
#[template(path = "reports/production_report.html")]
struct ProductionReportTemplate {
    from: String,
    to: String,
    groups: Vec<GroupView>,
    run_count: usize,
    shortfall_lines: usize,
    document_code: Option<String>,
    issued_on: Option<String>,
}

/// Batch group view for templates.
struct GroupView {
    batch_label: String,
    runs: Vec<RunView>,
}

/// Run view for templates.
struct RunView {
    formula_name: String,
    batch_label: String,
    quantity_produced: String,
    produced_at: String,
    lines: Vec<LineView>,
}

/// Material line view for templates.
struct LineView {
    name: String,
    lot_usage: String,
    quantity: String,
    shortfall: Option<String>,
}

impl ProductionReportTemplate {
    fn new(report: &ReportData, header: &SheetHeader) -> Self {
        let produced_unit = header.produced_unit.as_deref().unwrap_or_default();
        Self {
            from: report.from.format("%d/%m/%Y").to_string(),
            to: report.to.format("%d/%m/%Y").to_string(),
            groups: report
                .groups
                .iter()
                .map(|group| GroupView::new(group, produced_unit))
                .collect(),
            run_count: report.run_count(),
            shortfall_lines: report.shortfall_lines(),
            document_code: header.document_code.clone(),
            issued_on: header.issued_on.clone(),
        }
    }
}

impl GroupView {
    fn new(group: &BatchGroup, produced_unit: &str) -> Self {
        Self {
            batch_label: group.batch_label.clone(),
            runs: group
                .runs
                .iter()
                .map(|run| RunView::new(run, produced_unit))
                .collect(),
        }
    }
}

impl RunView {
    fn new(run: &RunBlock, produced_unit: &str) -> Self {
        Self {
            formula_name: run.formula_name.clone(),
            batch_label: run.batch_label.clone(),
            quantity_produced: with_unit(run.quantity_produced, produced_unit),
            produced_at: run.produced_at.format("%d/%m/%Y %H:%M").to_string(),
            lines: run.lines.iter().map(LineView::from).collect(),
        }
    }
}

impl From<&MaterialLine> for LineView {
    fn from(line: &MaterialLine) -> Self {
        Self {
            name: line.name.clone(),
            lot_usage: line.lot_usage.clone(),
            quantity: with_unit(line.quantity_required, &line.unit),
            shortfall: line.has_shortfall().then(|| with_unit(line.shortfall, &line.unit)),
        }
    }
}

fn with_unit(quantity: f64, unit: &str) -> String {
    if unit.is_empty() {
        format!("{quantity:.2}")
    } else {
        format!("{quantity:.2} {unit}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lotwise_core::{FormulaId, NO_ELIGIBLE_LOT, ProductionRunId, RawMaterialId};

    fn report() -> ReportData {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        ReportData {
            from: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            groups: vec![BatchGroup {
                batch_label: "L2 <mix>".to_string(),
                runs: vec![RunBlock {
                    run_id: ProductionRunId::new(2),
                    formula_id: FormulaId::new(1),
                    formula_name: "Syrup".to_string(),
                    batch_label: "L2 <mix>".to_string(),
                    quantity_produced: 12.0,
                    produced_at: day.and_hms_opt(10, 0, 0).unwrap(),
                    lines: vec![
                        MaterialLine {
                            raw_material_id: RawMaterialId::new(1),
                            name: "Sugar".to_string(),
                            unit: "kg".to_string(),
                            lot_usage: "A/B".to_string(),
                            quantity_required: 70.0,
                            shortfall: 0.0,
                            draws: Vec::new(),
                        },
                        MaterialLine {
                            raw_material_id: RawMaterialId::new(9),
                            name: "Material #9".to_string(),
                            unit: String::new(),
                            lot_usage: NO_ELIGIBLE_LOT.to_string(),
                            quantity_required: 3.5,
                            shortfall: 3.5,
                            draws: Vec::new(),
                        },
                    ],
                }],
            }],
        }
    }

    fn render(report: &ReportData) -> String {
        let document = HtmlRenderer::default().render(report).unwrap();
        assert_eq!(document.extension, "html");
        String::from_utf8(document.bytes).unwrap()
    }

    #[test]
    fn test_renders_lines_and_quantities() {
        let html = render(&report());

        assert!(html.contains("Sugar"));
        assert!(html.contains("A/B"));
        assert!(html.contains("70.00 kg"));
        assert!(html.contains("12.00"));
        assert!(html.contains("01/06/2025"));
    }

    #[test]
    fn test_marks_shortfall_lines() {
        let html = render(&report());

        assert!(html.contains("[no eligible lot]"));
        assert!(html.contains("shortfall"));
        assert!(html.contains("3.50"));
    }

    #[test]
    fn test_escapes_labels() {
        let html = render(&report());

        assert!(!html.contains("L2 <mix>"));
        assert!(html.contains("L2 &#60;mix&#62;") || html.contains("L2 &lt;mix&gt;"));
    }

    #[test]
    fn test_empty_report_renders_notice() {
        let mut empty = report();
        empty.groups.clear();

        let html = render(&empty);

        assert!(html.contains("No production runs"));
    }

    #[test]
    fn test_float_residue_is_not_marked() {
        let mut report = report();
        report.groups[0].runs[0].lines.truncate(1);
        report.groups[0].runs[0].lines[0].shortfall = 2.775_557_561_562_891_4e-17;

        let html = render(&report);

        assert!(!html.contains("<tr class=\"shortfall\">"));
        assert!(!html.contains("Lines with shortfall"));
    }

    #[test]
    fn test_sheet_header_is_optional() {
        let plain = render(&report());
        assert!(!plain.contains("Document No."));
        assert!(plain.contains("<strong>12.00</strong>"));

        let header = SheetHeader {
            document_code: Some("BPF 18".to_string()),
            issued_on: Some("02/01/2024".to_string()),
            produced_unit: Some("btd".to_string()),
        };
        let document = HtmlRenderer::new(header).render(&report()).unwrap();
        let html = String::from_utf8(document.bytes).unwrap();

        assert!(html.contains("Document No.: <strong>BPF 18</strong>"));
        assert!(html.contains("Issued: 02/01/2024"));
        assert!(html.contains("<strong>12.00 btd</strong>"));
    }

    #[test]
    fn test_with_unit_omits_blank_unit() {
        assert_eq!(with_unit(2.0, ""), "2.00");
        assert_eq!(with_unit(2.346, "kg"), "2.35 kg");
    }
}
