//! JSON snapshot file source.
//!
//! A snapshot is one JSON object holding the four datasets as arrays of rows,
//! using the same column names as the database tables:
//!
//! ```json
//! {
//!   "raw_materials": [{"id": 1, "name": "Sugar", "unit_of_measure": "kg"}],
//!   "lots": [{"id": 1, "raw_material_id": 1, "lot_number": "A", ...}],
//!   "formulas": [{"id": 1, "name": "Syrup", "components": "[...]"}],
//!   "production_runs": [{"id": 1, "formula_id": 1, "batch_label": "B1", ...}]
//! }
//! ```
//!
//! Rows may carry a `tenant_id`; rows without one are skipped when a tenant
//! is requested.

use std::path::Path;

use chrono::{FixedOffset, NaiveDateTime};
use lotwise_core::normalize::{FormulaRow, LotRow, ProductionRunRow, RawMaterialRow};
use lotwise_core::{Normalizer, TenantId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{DataSource, SourceError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SnapshotFile {
    raw_materials: Vec<Value>,
    lots: Vec<Value>,
    formulas: Vec<Value>,
    production_runs: Vec<Value>,
}

/// In-memory source backed by a parsed snapshot file.
#[derive(Debug)]
pub struct SnapshotSource {
    file: SnapshotFile,
    normalizer: Normalizer,
}

impl SnapshotSource {
    /// Read and parse a snapshot file.
    ///
    /// `offset` is the report calendar offset, used to apply the cutoff to
    /// production timestamps.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Io` if the file cannot be read, or
    /// `SourceError::Decode` if it is not a JSON object of row arrays.
    pub async fn open(path: impl AsRef<Path>, offset: FixedOffset) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let source = Self::from_slice(&bytes, offset)?;
        tracing::info!(path = %path.display(), "Snapshot file loaded");
        Ok(source)
    }

    /// Parse a snapshot from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Decode` if the bytes are not a snapshot object.
    pub fn from_slice(bytes: &[u8], offset: FixedOffset) -> Result<Self, SourceError> {
        Ok(Self {
            file: serde_json::from_slice(bytes)?,
            normalizer: Normalizer::new(offset),
        })
    }

    fn rows<T: DeserializeOwned>(
        rows: &[Value],
        tenant: Option<TenantId>,
    ) -> Result<Vec<T>, SourceError> {
        rows.iter()
            .filter(|row| belongs_to(row, tenant))
            .map(|row| serde_json::from_value(row.clone()).map_err(SourceError::from))
            .collect()
    }
}

fn belongs_to(row: &Value, tenant: Option<TenantId>) -> bool {
    let Some(tenant) = tenant else {
        return true;
    };
    row.get("tenant_id")
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<TenantId>().ok())
        == Some(tenant)
}

impl DataSource for SnapshotSource {
    async fn load_raw_materials(
        &self,
        tenant: Option<TenantId>,
    ) -> Result<Vec<RawMaterialRow>, SourceError> {
        Self::rows(&self.file.raw_materials, tenant)
    }

    async fn load_lots(&self, tenant: Option<TenantId>) -> Result<Vec<LotRow>, SourceError> {
        Self::rows(&self.file.lots, tenant)
    }

    async fn load_formulas(&self, tenant: Option<TenantId>) -> Result<Vec<FormulaRow>, SourceError> {
        Self::rows(&self.file.formulas, tenant)
    }

    async fn load_production_runs(
        &self,
        tenant: Option<TenantId>,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<ProductionRunRow>, SourceError> {
        let rows: Vec<ProductionRunRow> = Self::rows(&self.file.production_runs, tenant)?;
        Ok(rows
            .into_iter()
            // Unreadable timestamps fall back to the epoch, as in normalization.
            .filter(|row| {
                self.normalizer
                    .read_timestamp(&row.produced_at)
                    .unwrap_or_default()
                    < cutoff
            })
            .collect())
    }
}
