//! Normalization of loosely-typed source rows into canonical entities.
//!
//! Source rows come from JSON (`to_jsonb` rows out of `PostgreSQL`, or a
//! snapshot file). Any field may be missing, null, a number, or a number
//! encoded as text, and the two embedded structures (formula components and
//! per-run consumption) may be stored either as JSON or as JSON serialized
//! into a text column.
//!
//! Normalization never fails on an individual field. Every field has a
//! documented fallback:
//!
//! | field kind | fallback |
//! |---|---|
//! | number | `0.0` (also for NaN/infinite) |
//! | identity | `0` |
//! | text | `""` |
//! | timestamp | Unix epoch, logged at `warn` |
//! | formula components | `None` |
//! | consumption map | empty map |

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{Formula, FormulaComponent, Lot, ProductionRun, RawMaterial, Snapshot};
use crate::types::{
    FormulaId, LotId, ProductionRunId, RawMaterialId, SupplierId, parse_timestamp,
};

// =============================================================================
// Raw Row Types
// =============================================================================

/// Raw `raw_materials` row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMaterialRow {
    pub id: Value,
    pub name: Value,
    pub unit_of_measure: Value,
    pub stock_on_hand: Value,
}

/// Raw `formulas` row. `components` is JSON or JSON text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaRow {
    pub id: Value,
    pub name: Value,
    pub components: Value,
}

/// Raw `lots` row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LotRow {
    pub id: Value,
    pub raw_material_id: Value,
    pub supplier_id: Value,
    pub lot_number: Value,
    pub quantity_received: Value,
    pub quantity_on_hand: Value,
    pub received_at: Value,
}

/// Raw `production_runs` row. `raw_materials_consumed` is JSON or JSON text
/// mapping raw material IDs to quantities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionRunRow {
    pub id: Value,
    pub formula_id: Value,
    pub batch_label: Value,
    pub quantity_produced: Value,
    pub produced_at: Value,
    pub raw_materials_consumed: Value,
}

/// One entry of a formula's component list, before coercion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FormulaComponentRow {
    quantity: Value,
    unit_of_measure: Value,
    raw_material_id: Value,
}

/// All four raw datasets for one report generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    pub raw_materials: Vec<RawMaterialRow>,
    pub formulas: Vec<FormulaRow>,
    pub lots: Vec<LotRow>,
    pub production_runs: Vec<ProductionRunRow>,
}

// =============================================================================
// Coercion
// =============================================================================

/// Parse an embedded structured field, falling back instead of failing.
///
/// The value may already be structured JSON, or JSON serialized into a
/// string. Null, unparseable text and shape mismatches all produce
/// `fallback()`.
pub fn parse_or_default<T, F>(value: &Value, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let parsed = match value {
        Value::Null => None,
        Value::String(text) => serde_json::from_str(text).ok(),
        other => T::deserialize(other).ok(),
    };
    parsed.unwrap_or_else(fallback)
}

/// Coerce a numeric field. Unparseable or non-finite values become `0.0`.
#[must_use]
pub fn coerce_f64(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { Some(0.0) } else { s.parse::<f64>().ok() }
        }
        _ => None,
    };
    number.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Coerce an identity field. Anything that is not an integral number
/// (or integral number text) becomes `0`.
#[must_use]
pub fn coerce_id(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => parse_id(s),
        _ => None,
    }
    .unwrap_or(0)
}

/// Coerce a text field. Null or missing becomes `""`; scalars are
/// stringified.
#[must_use]
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce an optional reference. Null, missing or unparseable is `None`.
fn coerce_optional_id(value: &Value) -> Option<i64> {
    match value {
        Value::Null => None,
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => parse_id(s),
        _ => None,
    }
}

fn parse_id(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(integral))
}

#[allow(clippy::cast_possible_truncation)]
fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15).then_some(n as i64)
}

// =============================================================================
// Normalizer
// =============================================================================

/// Converts raw rows into canonical entities.
///
/// Holds the UTC offset that defines the report's local calendar.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    offset: FixedOffset,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl Normalizer {
    /// Create a normalizer that reads zoned timestamps into `offset`.
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The local calendar offset in use.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Normalize a whole snapshot.
    #[must_use]
    pub fn normalize(&self, raw: &RawSnapshot) -> Snapshot {
        let snapshot = Snapshot {
            raw_materials: raw
                .raw_materials
                .iter()
                .map(|row| {
                    let material = self.raw_material(row);
                    (material.id, material)
                })
                .collect::<HashMap<_, _>>(),
            formulas: raw
                .formulas
                .iter()
                .map(|row| {
                    let formula = self.formula(row);
                    (formula.id, formula)
                })
                .collect::<HashMap<_, _>>(),
            production_runs: raw
                .production_runs
                .iter()
                .map(|row| self.production_run(row))
                .collect(),
            lots: raw.lots.iter().map(|row| self.lot(row)).collect(),
        };

        debug!(
            raw_materials = snapshot.raw_materials.len(),
            formulas = snapshot.formulas.len(),
            production_runs = snapshot.production_runs.len(),
            lots = snapshot.lots.len(),
            "Snapshot normalized"
        );

        snapshot
    }

    /// Normalize one raw material row.
    #[must_use]
    pub fn raw_material(&self, row: &RawMaterialRow) -> RawMaterial {
        RawMaterial {
            id: RawMaterialId::new(coerce_id(&row.id)),
            name: coerce_string(&row.name),
            unit_of_measure: coerce_string(&row.unit_of_measure),
            stock_on_hand: coerce_f64(&row.stock_on_hand),
        }
    }

    /// Normalize one formula row.
    #[must_use]
    pub fn formula(&self, row: &FormulaRow) -> Formula {
        let components = parse_or_default::<Option<Vec<FormulaComponentRow>>, _>(
            &row.components,
            || None,
        )
        .map(|rows| {
            rows.iter()
                .map(|c| FormulaComponent {
                    quantity: coerce_f64(&c.quantity),
                    unit_of_measure: coerce_string(&c.unit_of_measure),
                    raw_material_id: RawMaterialId::new(coerce_id(&c.raw_material_id)),
                })
                .collect()
        });

        Formula {
            id: FormulaId::new(coerce_id(&row.id)),
            name: coerce_string(&row.name),
            components,
        }
    }

    /// Normalize one lot row.
    #[must_use]
    pub fn lot(&self, row: &LotRow) -> Lot {
        let id = LotId::new(coerce_id(&row.id));
        Lot {
            id,
            raw_material_id: RawMaterialId::new(coerce_id(&row.raw_material_id)),
            supplier_id: coerce_optional_id(&row.supplier_id).map(SupplierId::new),
            lot_number: coerce_string(&row.lot_number),
            quantity_received: coerce_f64(&row.quantity_received),
            quantity_on_hand: coerce_f64(&row.quantity_on_hand),
            received_at: self.timestamp(&row.received_at, "lot", id.as_i64()),
        }
    }

    /// Normalize one production run row.
    #[must_use]
    pub fn production_run(&self, row: &ProductionRunRow) -> ProductionRun {
        let id = ProductionRunId::new(coerce_id(&row.id));
        ProductionRun {
            id,
            formula_id: FormulaId::new(coerce_id(&row.formula_id)),
            batch_label: coerce_string(&row.batch_label),
            quantity_produced: coerce_f64(&row.quantity_produced),
            produced_at: self.timestamp(&row.produced_at, "production_run", id.as_i64()),
            consumption: consumption_map(&row.raw_materials_consumed, id),
        }
    }

    /// Read a timestamp field (text, or epoch milliseconds) into local time.
    ///
    /// Silent; `None` when unreadable.
    #[must_use]
    pub fn read_timestamp(&self, value: &Value) -> Option<NaiveDateTime> {
        match value {
            Value::String(s) => parse_timestamp(s, self.offset),
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| dt.with_timezone(&self.offset).naive_local()),
            _ => None,
        }
    }

    /// Coerce a timestamp field; epoch when unreadable.
    fn timestamp(&self, value: &Value, entity: &'static str, id: i64) -> NaiveDateTime {
        self.read_timestamp(value).unwrap_or_else(|| {
            warn!(entity, id, value = %value, "Unreadable timestamp, using epoch");
            NaiveDateTime::default()
        })
    }
}

/// Build the per-run consumption map.
///
/// Keys that are not integer raw material IDs are dropped.
fn consumption_map(value: &Value, run_id: ProductionRunId) -> BTreeMap<RawMaterialId, f64> {
    let entries = parse_or_default::<Map<String, Value>, _>(value, Map::new);

    entries
        .iter()
        .filter_map(|(key, quantity)| {
            let Some(id) = parse_id(key) else {
                warn!(run_id = %run_id, key = %key, "Dropping consumption entry with non-numeric material id");
                return None;
            };
            Some((RawMaterialId::new(id), coerce_f64(quantity)))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn run_row(value: Value) -> ProductionRunRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_or_default_accepts_structured_and_text() {
        let structured: Map<String, Value> = parse_or_default(&json!({"1": 5}), Map::new);
        let text: Map<String, Value> = parse_or_default(&json!("{\"1\": 5}"), Map::new);
        assert_eq!(structured, text);
    }

    #[test]
    fn test_parse_or_default_falls_back() {
        let bad: Map<String, Value> = parse_or_default(&json!("{not json"), Map::new);
        let null: Map<String, Value> = parse_or_default(&Value::Null, Map::new);
        let wrong_shape: Map<String, Value> = parse_or_default(&json!([1, 2]), Map::new);
        assert!(bad.is_empty());
        assert!(null.is_empty());
        assert!(wrong_shape.is_empty());
    }

    #[test]
    fn test_coerce_f64() {
        assert_eq!(coerce_f64(&json!(12.5)), 12.5);
        assert_eq!(coerce_f64(&json!(" 7.25 ")), 7.25);
        assert_eq!(coerce_f64(&json!("")), 0.0);
        assert_eq!(coerce_f64(&json!("abc")), 0.0);
        assert_eq!(coerce_f64(&json!("NaN")), 0.0);
        assert_eq!(coerce_f64(&json!("inf")), 0.0);
        assert_eq!(coerce_f64(&Value::Null), 0.0);
        assert_eq!(coerce_f64(&json!({"a": 1})), 0.0);
    }

    #[test]
    fn test_coerce_id() {
        assert_eq!(coerce_id(&json!(42)), 42);
        assert_eq!(coerce_id(&json!("42")), 42);
        assert_eq!(coerce_id(&json!(42.0)), 42);
        assert_eq!(coerce_id(&json!("42.5")), 0);
        assert_eq!(coerce_id(&json!(null)), 0);
    }

    #[test]
    fn test_coerce_string() {
        assert_eq!(coerce_string(&Value::Null), "");
        assert_eq!(coerce_string(&json!("kg")), "kg");
        assert_eq!(coerce_string(&json!(17)), "17");
    }

    #[test]
    fn test_production_run_with_text_consumption() {
        let run = Normalizer::default().production_run(&run_row(json!({
            "id": "7",
            "formula_id": 3,
            "batch_label": "L-100",
            "quantity_produced": "250",
            "produced_at": "2025-06-02T08:00:00Z",
            "raw_materials_consumed": "{\"12\": \"40.5\", \"3\": 10, \"x\": 1}"
        })));

        assert_eq!(run.id, ProductionRunId::new(7));
        assert_eq!(run.formula_id, FormulaId::new(3));
        assert_eq!(run.quantity_produced, 250.0);
        assert_eq!(run.consumption.len(), 2);
        assert_eq!(run.consumption[&RawMaterialId::new(12)], 40.5);
        // BTreeMap keeps ascending material order.
        let keys: Vec<i64> = run.consumption.keys().map(RawMaterialId::as_i64).collect();
        assert_eq!(keys, vec![3, 12]);
    }

    #[test]
    fn test_production_run_with_missing_fields() {
        let run = Normalizer::default().production_run(&run_row(json!({ "id": 1 })));
        assert_eq!(run.batch_label, "");
        assert_eq!(run.quantity_produced, 0.0);
        assert!(run.consumption.is_empty());
        assert_eq!(run.produced_at, NaiveDateTime::default());
    }

    #[test]
    fn test_formula_components_fallback_to_none() {
        let normalizer = Normalizer::default();
        let row: FormulaRow = serde_json::from_value(json!({
            "id": 1, "name": "Ração", "components": "oops"
        }))
        .unwrap();
        assert!(normalizer.formula(&row).components.is_none());

        let row: FormulaRow = serde_json::from_value(json!({
            "id": 2,
            "name": "Mix",
            "components": "[{\"quantity\": \"2\", \"unit_of_measure\": \"kg\", \"raw_material_id\": \"5\"}]"
        }))
        .unwrap();
        let components = normalizer.formula(&row).components.unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].raw_material_id, RawMaterialId::new(5));
        assert_eq!(components[0].quantity, 2.0);
    }

    #[test]
    fn test_lot_normalization() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let row: LotRow = serde_json::from_value(json!({
            "id": 9,
            "raw_material_id": "4",
            "supplier_id": null,
            "lot_number": "A-1",
            "quantity_received": "100",
            "quantity_on_hand": 12,
            "received_at": "2025-05-01T03:00:00+00:00"
        }))
        .unwrap();

        let lot = Normalizer::new(offset).lot(&row);
        assert_eq!(lot.raw_material_id, RawMaterialId::new(4));
        assert_eq!(lot.supplier_id, None);
        assert_eq!(lot.quantity_received, 100.0);
        assert_eq!(lot.quantity_on_hand, 12.0);
        assert_eq!(
            lot.received_at,
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_snapshot_keys_reference_data_by_id() {
        let raw: RawSnapshot = serde_json::from_value(json!({
            "raw_materials": [
                {"id": 1, "name": "Milho", "unit_of_measure": "kg"},
                {"id": "2", "name": "Soja", "unit_of_measure": "kg"}
            ],
            "formulas": [{"id": 10, "name": "Engorda"}]
        }))
        .unwrap();

        let snapshot = Normalizer::default().normalize(&raw);
        assert_eq!(snapshot.raw_materials[&RawMaterialId::new(2)].name, "Soja");
        assert_eq!(snapshot.formulas[&FormulaId::new(10)].name, "Engorda");
        assert!(snapshot.lots.is_empty());
        assert!(snapshot.production_runs.is_empty());
    }

    #[test]
    fn test_read_timestamp_is_optional() {
        let normalizer = Normalizer::default();
        let june = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(normalizer.read_timestamp(&json!("2025-06-01")), Some(june));
        assert_eq!(
            normalizer.read_timestamp(&json!(june.and_utc().timestamp_millis())),
            Some(june)
        );
        assert_eq!(normalizer.read_timestamp(&json!("soon")), None);
        assert_eq!(normalizer.read_timestamp(&Value::Null), None);
    }
}
