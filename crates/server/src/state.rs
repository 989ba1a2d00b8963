//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{ReportConfig, ServerConfig};
use crate::db::PgReportSource;
use crate::service::ReportService;
use crate::source::ReportSource;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    reports: ReportService<ReportSource>,
}

impl AppState {
    /// Build state reading reports from the database behind `pool`.
    #[must_use]
    pub fn new(config: &ServerConfig, pool: PgPool) -> Self {
        let source = ReportSource::Postgres(PgReportSource::new(
            pool.clone(),
            config.report.utc_offset,
        ));
        Self::with_source(pool, source, &config.report)
    }

    /// Build state with an explicit report source.
    ///
    /// `pool` is still used for readiness checks.
    #[must_use]
    pub fn with_source(pool: PgPool, source: ReportSource, report: &ReportConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                reports: ReportService::new(source, report),
            }),
        }
    }

    /// Database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Report generation service.
    #[must_use]
    pub fn reports(&self) -> &ReportService<ReportSource> {
        &self.inner.reports
    }
}
