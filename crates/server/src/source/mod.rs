//! Report data sources.
//!
//! A data source hands back raw rows for the four datasets a report needs.
//! Rows stay loosely typed here; [`lotwise_core::Normalizer`] turns them into
//! entities once all four have arrived.
//!
//! Production runs are only bounded above by the cutoff. Runs before the
//! report window still consume lots, so they must be loaded too.

pub mod snapshot;

use std::future::Future;

use chrono::NaiveDateTime;
use lotwise_core::TenantId;
use lotwise_core::normalize::{FormulaRow, LotRow, ProductionRunRow, RawMaterialRow, RawSnapshot};
use thiserror::Error;

pub use snapshot::SnapshotSource;

use crate::db::PgReportSource;

/// Errors raised while loading source rows.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Snapshot file could not be read.
    #[error("snapshot file error: {0}")]
    Io(#[from] std::io::Error),

    /// A row was not a JSON object, or the snapshot file was not valid JSON.
    #[error("malformed source data: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Somewhere raw report rows can be loaded from.
///
/// `tenant` restricts every dataset to one tenant; `None` loads everything.
pub trait DataSource: Send + Sync {
    /// Load all raw material rows.
    fn load_raw_materials(
        &self,
        tenant: Option<TenantId>,
    ) -> impl Future<Output = Result<Vec<RawMaterialRow>, SourceError>> + Send;

    /// Load all lot rows.
    fn load_lots(
        &self,
        tenant: Option<TenantId>,
    ) -> impl Future<Output = Result<Vec<LotRow>, SourceError>> + Send;

    /// Load all formula rows.
    fn load_formulas(
        &self,
        tenant: Option<TenantId>,
    ) -> impl Future<Output = Result<Vec<FormulaRow>, SourceError>> + Send;

    /// Load production runs produced strictly before `cutoff` (local time).
    fn load_production_runs(
        &self,
        tenant: Option<TenantId>,
        cutoff: NaiveDateTime,
    ) -> impl Future<Output = Result<Vec<ProductionRunRow>, SourceError>> + Send;
}

/// The sources the server and CLI can be configured with.
#[derive(Debug)]
pub enum ReportSource {
    /// Live `PostgreSQL` database.
    Postgres(PgReportSource),
    /// Snapshot file loaded into memory.
    Snapshot(SnapshotSource),
}

impl DataSource for ReportSource {
    async fn load_raw_materials(
        &self,
        tenant: Option<TenantId>,
    ) -> Result<Vec<RawMaterialRow>, SourceError> {
        match self {
            Self::Postgres(source) => source.load_raw_materials(tenant).await,
            Self::Snapshot(source) => source.load_raw_materials(tenant).await,
        }
    }

    async fn load_lots(&self, tenant: Option<TenantId>) -> Result<Vec<LotRow>, SourceError> {
        match self {
            Self::Postgres(source) => source.load_lots(tenant).await,
            Self::Snapshot(source) => source.load_lots(tenant).await,
        }
    }

    async fn load_formulas(&self, tenant: Option<TenantId>) -> Result<Vec<FormulaRow>, SourceError> {
        match self {
            Self::Postgres(source) => source.load_formulas(tenant).await,
            Self::Snapshot(source) => source.load_formulas(tenant).await,
        }
    }

    async fn load_production_runs(
        &self,
        tenant: Option<TenantId>,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<ProductionRunRow>, SourceError> {
        match self {
            Self::Postgres(source) => source.load_production_runs(tenant, cutoff).await,
            Self::Snapshot(source) => source.load_production_runs(tenant, cutoff).await,
        }
    }
}

/// Load all four datasets concurrently.
///
/// # Errors
///
/// Returns the first `SourceError` raised; no partial snapshot is returned.
pub async fn load_snapshot<S: DataSource>(
    source: &S,
    tenant: Option<TenantId>,
    cutoff: NaiveDateTime,
) -> Result<RawSnapshot, SourceError> {
    let (production_runs, raw_materials, lots, formulas) = tokio::try_join!(
        source.load_production_runs(tenant, cutoff),
        source.load_raw_materials(tenant),
        source.load_lots(tenant),
        source.load_formulas(tenant),
    )?;

    tracing::debug!(
        production_runs = production_runs.len(),
        raw_materials = raw_materials.len(),
        lots = lots.len(),
        formulas = formulas.len(),
        "Source rows loaded"
    );

    Ok(RawSnapshot {
        raw_materials,
        formulas,
        lots,
        production_runs,
    })
}
