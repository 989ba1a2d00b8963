//! Canonical domain entities.
//!
//! These are the typed forms produced by [`crate::normalize`]. They are
//! read-only snapshots for a single report generation.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::{FormulaId, LotId, ProductionRunId, RawMaterialId, SupplierId};

/// A raw material (reference data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMaterial {
    /// Unique raw material ID.
    pub id: RawMaterialId,
    /// Display name.
    pub name: String,
    /// Unit of measure (e.g. "kg").
    pub unit_of_measure: String,
    /// Current stock figure kept by the source system. Informational only.
    pub stock_on_hand: f64,
}

/// One component line of a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaComponent {
    /// Quantity of the raw material per formula unit.
    pub quantity: f64,
    /// Unit the quantity is expressed in.
    pub unit_of_measure: String,
    /// Raw material this component draws on.
    pub raw_material_id: RawMaterialId,
}

/// A product formula (reference data, used for display).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    /// Unique formula ID.
    pub id: FormulaId,
    /// Display name.
    pub name: String,
    /// Component list, when the source record carried a readable one.
    pub components: Option<Vec<FormulaComponent>>,
}

/// A received lot of one raw material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Unique lot ID.
    pub id: LotId,
    /// Raw material this lot belongs to.
    pub raw_material_id: RawMaterialId,
    /// Supplier the lot was received from, if recorded.
    pub supplier_id: Option<SupplierId>,
    /// Lot number as printed on the receipt.
    pub lot_number: String,
    /// Quantity received. This is the FIFO supply figure.
    pub quantity_received: f64,
    /// Quantity the source system currently reports on hand. Informational only.
    pub quantity_on_hand: f64,
    /// When the lot was received (local calendar time).
    pub received_at: NaiveDateTime,
}

/// One production run of a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRun {
    /// Unique run ID.
    pub id: ProductionRunId,
    /// Formula that was produced.
    pub formula_id: FormulaId,
    /// Production-batch label shared by related runs.
    pub batch_label: String,
    /// Quantity produced.
    pub quantity_produced: f64,
    /// When the run happened (local calendar time).
    pub produced_at: NaiveDateTime,
    /// Quantity consumed per raw material.
    pub consumption: BTreeMap<RawMaterialId, f64>,
}

/// A normalized snapshot of everything a report generation needs.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Raw materials by ID.
    pub raw_materials: HashMap<RawMaterialId, RawMaterial>,
    /// Formulas by ID.
    pub formulas: HashMap<FormulaId, Formula>,
    /// Production runs in load order.
    pub production_runs: Vec<ProductionRun>,
    /// Lots in load order.
    pub lots: Vec<Lot>,
}
