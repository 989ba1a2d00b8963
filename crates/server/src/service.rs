//! Report generation service.
//!
//! Runs one generation end to end: fetch -> normalize -> allocate ->
//! aggregate -> render -> (persist). Only the fetch phase is bounded by the
//! configured deadline. Every generation returns a [`GenerationSummary`]
//! describing what happened; nothing is kept between calls.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use lotwise_core::{Normalizer, ReportStats, ReportWindow, TenantId, WindowError, build_report};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::ReportConfig;
use crate::render::{RenderError, RenderedDocument, ReportFormat, SheetHeader};
use crate::source::{DataSource, SourceError, load_snapshot};
use crate::storage::{LocalStorage, StorageError, StorageSink, StoredReference};

/// Errors raised by a report generation, tagged by phase.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The requested window is not valid.
    #[error("invalid report window: {0}")]
    InvalidWindow(#[from] WindowError),

    /// Loading source data failed.
    #[error("failed to load report data: {0}")]
    DataLoad(#[from] SourceError),

    /// Loading source data exceeded the deadline.
    #[error("loading report data timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Rendering failed.
    #[error("failed to render report: {0}")]
    Render(#[from] RenderError),

    /// Persisting failed.
    #[error("failed to store report: {0}")]
    Storage(#[from] StorageError),

    /// Storing was requested but no storage is configured.
    #[error("report storage is not configured")]
    StorageNotConfigured,
}

impl ReportError {
    /// The phase that failed: `request`, `data_load`, `render` or `storage`.
    #[must_use]
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::InvalidWindow(_) | Self::StorageNotConfigured => "request",
            Self::DataLoad(_) | Self::Timeout(_) => "data_load",
            Self::Render(_) => "render",
            Self::Storage(_) => "storage",
        }
    }
}

/// A request for one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// First day (inclusive).
    pub from: NaiveDate,
    /// Last day (inclusive).
    pub to: NaiveDate,
    /// Restrict to one tenant.
    #[serde(default)]
    pub tenant: Option<TenantId>,
    /// Output format.
    #[serde(default)]
    pub format: ReportFormat,
    /// Persist the document and return a reference.
    #[serde(default)]
    pub store: bool,
}

impl ReportRequest {
    /// Request an HTML report for `from` through `to`.
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            tenant: None,
            format: ReportFormat::default(),
            store: false,
        }
    }

    /// Download file name, e.g. `fifo_2025-06-01_to_2025-06-30.html`.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        self.file_name_with("fifo", extension)
    }

    /// Download file name under another prefix, e.g. `custom_<from>_to_<to>.html`.
    #[must_use]
    pub fn file_name_with(&self, prefix: &str, extension: &str) -> String {
        format!("{prefix}_{}_to_{}.{extension}", self.from, self.to)
    }

    fn storage_name(&self) -> String {
        format!("production_{}_to_{}", self.from, self.to)
    }
}

/// What happened during one generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    /// Renderer used.
    pub renderer: &'static str,
    /// Aggregation counts.
    #[serde(flatten)]
    pub stats: ReportStats,
    /// Size of the rendered document.
    pub bytes: usize,
    /// Whether the document was persisted.
    pub stored: bool,
    /// Time spent loading source data.
    pub fetch_ms: u64,
    /// Total generation time.
    pub total_ms: u64,
}

/// A finished report.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    /// The rendered document.
    pub document: RenderedDocument,
    /// Where the document was stored, when storing was requested.
    pub reference: Option<StoredReference>,
    /// Generation summary.
    pub summary: GenerationSummary,
}

/// Generates reports from a data source.
#[derive(Debug)]
pub struct ReportService<S, K = LocalStorage> {
    source: S,
    storage: Option<K>,
    normalizer: Normalizer,
    fetch_timeout: Duration,
    sheet: SheetHeader,
}

impl<S: DataSource> ReportService<S, LocalStorage> {
    /// Create a service over `source` using `config` for the calendar
    /// offset, fetch deadline and local storage.
    #[must_use]
    pub fn new(source: S, config: &ReportConfig) -> Self {
        Self {
            source,
            storage: config.storage.as_ref().map(LocalStorage::from),
            normalizer: Normalizer::new(config.utc_offset),
            fetch_timeout: config.fetch_timeout,
            sheet: config.sheet.clone(),
        }
    }
}

impl<S: DataSource, K: StorageSink> ReportService<S, K> {
    /// Replace the storage sink.
    #[must_use]
    pub fn with_storage<K2: StorageSink>(self, storage: K2) -> ReportService<S, K2> {
        ReportService {
            source: self.source,
            storage: Some(storage),
            normalizer: self.normalizer,
            fetch_timeout: self.fetch_timeout,
            sheet: self.sheet,
        }
    }

    /// Whether reports can be stored.
    #[must_use]
    pub const fn can_store(&self) -> bool {
        self.storage.is_some()
    }

    /// Generate one report.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` naming the phase that failed. No partial report
    /// is ever produced.
    #[instrument(skip(self), fields(from = %request.from, to = %request.to, format = %request.format))]
    pub async fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport, ReportError> {
        let started = Instant::now();

        let window = ReportWindow::new(request.from, request.to)?;
        if request.store && self.storage.is_none() {
            return Err(ReportError::StorageNotConfigured);
        }

        let raw = tokio::time::timeout(
            self.fetch_timeout,
            load_snapshot(&self.source, request.tenant, window.cutoff()),
        )
        .await
        .map_err(|_| ReportError::Timeout(self.fetch_timeout))??;
        let fetch_ms = elapsed_ms(started);

        let snapshot = self.normalizer.normalize(&raw);
        let (report, stats) = build_report(&snapshot, &window);

        let renderer = request.format.renderer_with(&self.sheet);
        let document = renderer.render(&report)?;

        let reference = match (&self.storage, request.store) {
            (Some(storage), true) => Some(storage.persist(&document, &request.storage_name()).await?),
            _ => None,
        };

        let summary = GenerationSummary {
            renderer: renderer.name(),
            stats,
            bytes: document.bytes.len(),
            stored: reference.is_some(),
            fetch_ms,
            total_ms: elapsed_ms(started),
        };

        tracing::info!(
            renderer = summary.renderer,
            runs_considered = summary.stats.runs_considered,
            runs_in_window = summary.stats.runs_in_window,
            groups = summary.stats.groups,
            shortfall_lines = summary.stats.shortfall_lines,
            bytes = summary.bytes,
            fetch_ms = summary.fetch_ms,
            total_ms = summary.total_ms,
            "Report generated"
        );

        Ok(GeneratedReport {
            document,
            reference,
            summary,
        })
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
