//! Report renderers.
//!
//! A renderer turns [`ReportData`] into document bytes. It only formats what
//! the aggregator produced; lot usage and shortfall figures are shown as-is.

pub mod html;
pub mod json;

use std::fmt;
use std::str::FromStr;

use lotwise_core::ReportData;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use html::HtmlRenderer;
pub use json::JsonRenderer;

/// Errors raised while rendering a report.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template rendering failed.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A rendered report document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Document contents.
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `text/html; charset=utf-8`.
    pub content_type: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
}

/// Turns report data into a document.
pub trait Renderer: Send + Sync {
    /// Short name used in logs and generation summaries.
    fn name(&self) -> &'static str;

    /// Render the report.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the document cannot be produced.
    fn render(&self, report: &ReportData) -> Result<RenderedDocument, RenderError>;
}

/// Site-specific text printed on the HTML sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetHeader {
    /// Document-control code, e.g. `BPF 18`.
    pub document_code: Option<String>,
    /// Issue date of the controlled form, printed verbatim.
    pub issued_on: Option<String>,
    /// Unit shown after each run's produced quantity, e.g. `btd`.
    pub produced_unit: Option<String>,
}

/// Output format selectable by callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Printable HTML document.
    #[default]
    Html,
    /// Structured JSON.
    Json,
}

impl ReportFormat {
    /// The renderer for this format.
    #[must_use]
    pub fn renderer(self) -> Box<dyn Renderer> {
        self.renderer_with(&SheetHeader::default())
    }

    /// The renderer for this format, with `header` applied to the HTML sheet.
    #[must_use]
    pub fn renderer_with(self, header: &SheetHeader) -> Box<dyn Renderer> {
        match self {
            Self::Html => Box::new(HtmlRenderer::new(header.clone())),
            Self::Json => Box::new(JsonRenderer),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => write!(f, "html"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_format_selects_renderer() {
        assert_eq!(ReportFormat::Html.renderer().name(), "html");
        assert_eq!(ReportFormat::Json.renderer().name(), "json");
    }
}
