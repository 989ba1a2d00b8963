//! `PostgreSQL` report source.
//!
//! Rows are selected as `to_jsonb(row)` so that they reach the normalizer in
//! the same loose shape a snapshot file has, whatever the column types are
//! (numeric vs text quantities, JSONB vs text consumption maps).

use chrono::{FixedOffset, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use lotwise_core::TenantId;
use lotwise_core::normalize::{FormulaRow, LotRow, ProductionRunRow, RawMaterialRow};

use crate::source::{DataSource, SourceError};

const RAW_MATERIALS_SQL: &str = r"
    SELECT to_jsonb(m)
    FROM raw_materials m
    WHERE ($1::uuid IS NULL OR m.tenant_id = $1)
    ORDER BY m.id
";

const LOTS_SQL: &str = r"
    SELECT to_jsonb(l)
    FROM lots l
    WHERE ($1::uuid IS NULL OR l.tenant_id = $1)
    ORDER BY l.id
";

const FORMULAS_SQL: &str = r"
    SELECT to_jsonb(f)
    FROM formulas f
    WHERE ($1::uuid IS NULL OR f.tenant_id = $1)
    ORDER BY f.id
";

// No lower bound: runs before the window still consume lots.
const PRODUCTION_RUNS_SQL: &str = r"
    SELECT to_jsonb(p)
    FROM production_runs p
    WHERE ($1::uuid IS NULL OR p.tenant_id = $1)
      AND p.produced_at < $2
    ORDER BY p.produced_at, p.id
";

/// Report source reading from the Lotwise `PostgreSQL` schema.
#[derive(Debug, Clone)]
pub struct PgReportSource {
    pool: PgPool,
    offset: FixedOffset,
}

impl PgReportSource {
    /// Create a source over `pool`. `offset` is the report calendar offset,
    /// used to turn the local cutoff into an instant.
    #[must_use]
    pub const fn new(pool: PgPool, offset: FixedOffset) -> Self {
        Self { pool, offset }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        sql: &'static str,
        tenant: Option<TenantId>,
    ) -> Result<Vec<T>, SourceError> {
        let rows: Vec<Value> = sqlx::query_scalar(sql)
            .bind(tenant.map(|tenant| tenant.as_uuid()))
            .fetch_all(&self.pool)
            .await?;
        decode(rows)
    }
}

fn decode<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, SourceError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(SourceError::from))
        .collect()
}

impl DataSource for PgReportSource {
    #[tracing::instrument(skip(self))]
    async fn load_raw_materials(
        &self,
        tenant: Option<TenantId>,
    ) -> Result<Vec<RawMaterialRow>, SourceError> {
        self.fetch(RAW_MATERIALS_SQL, tenant).await
    }

    #[tracing::instrument(skip(self))]
    async fn load_lots(&self, tenant: Option<TenantId>) -> Result<Vec<LotRow>, SourceError> {
        self.fetch(LOTS_SQL, tenant).await
    }

    #[tracing::instrument(skip(self))]
    async fn load_formulas(&self, tenant: Option<TenantId>) -> Result<Vec<FormulaRow>, SourceError> {
        self.fetch(FORMULAS_SQL, tenant).await
    }

    #[tracing::instrument(skip(self))]
    async fn load_production_runs(
        &self,
        tenant: Option<TenantId>,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<ProductionRunRow>, SourceError> {
        let cutoff = cutoff
            .and_local_timezone(self.offset)
            .single()
            .map_or_else(|| cutoff.and_utc(), |local| local.to_utc());
        let tenant: Option<Uuid> = tenant.map(|tenant| tenant.as_uuid());

        let rows: Vec<Value> = sqlx::query_scalar(PRODUCTION_RUNS_SQL)
            .bind(tenant)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        decode(rows)
    }
}
