//! Structured JSON output of the report.

use lotwise_core::ReportData;

use super::{RenderError, RenderedDocument, Renderer};

/// Renders the report as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn render(&self, report: &ReportData) -> Result<RenderedDocument, RenderError> {
        let mut bytes = serde_json::to_vec_pretty(report)?;
        bytes.push(b'\n');
        Ok(RenderedDocument {
            bytes,
            content_type: "application/json",
            extension: "json",
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;

    #[test]
    fn test_renders_window_and_groups() {
        let report = ReportData {
            from: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            groups: Vec::new(),
        };

        let document = JsonRenderer.render(&report).unwrap();
        let value: Value = serde_json::from_slice(&document.bytes).unwrap();

        assert_eq!(document.content_type, "application/json");
        assert_eq!(value["from"], "2025-06-01");
        assert_eq!(value["to"], "2025-06-30");
        assert!(value["groups"].as_array().unwrap().is_empty());
    }
}
