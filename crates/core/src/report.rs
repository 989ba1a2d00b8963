//! Production report aggregation.
//!
//! Turns a snapshot plus its full-history allocation into the ordered
//! structure renderers consume: batch groups, then runs, then one line per
//! consumed raw material.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::fifo::{self, AllocationMap, LotDraw, LotUsage, MaterialAllocation};
use crate::model::{ProductionRun, Snapshot};
use crate::types::{FormulaId, ProductionRunId, RawMaterialId};
use crate::window::ReportWindow;

/// A complete production report for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    /// First day covered.
    pub from: NaiveDate,
    /// Last day covered (inclusive).
    pub to: NaiveDate,
    /// Batch groups, earliest first.
    pub groups: Vec<BatchGroup>,
}

impl ReportData {
    /// Number of runs across all groups.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.groups.iter().map(|group| group.runs.len()).sum()
    }

    /// Number of material lines with uncovered consumption.
    #[must_use]
    pub fn shortfall_lines(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| &group.runs)
            .flat_map(|run| &run.lines)
            .filter(|line| line.has_shortfall())
            .count()
    }

    /// Whether the window contained no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Runs sharing a production-batch label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchGroup {
    pub batch_label: String,
    pub runs: Vec<RunBlock>,
}

/// One production run as shown in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunBlock {
    pub run_id: ProductionRunId,
    pub formula_id: FormulaId,
    pub formula_name: String,
    pub batch_label: String,
    pub quantity_produced: f64,
    pub produced_at: NaiveDateTime,
    pub lines: Vec<MaterialLine>,
}

/// One consumed raw material of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialLine {
    pub raw_material_id: RawMaterialId,
    pub name: String,
    pub unit: String,
    /// Lot numbers joined with `/`, or the no-eligible-lot text.
    pub lot_usage: String,
    pub quantity_required: f64,
    /// Quantity no lot could cover; zero when fully supplied.
    pub shortfall: f64,
    pub draws: Vec<LotDraw>,
}

impl MaterialLine {
    /// Whether part of the requirement went uncovered.
    #[must_use]
    pub fn has_shortfall(&self) -> bool {
        fifo::uncovered(self.shortfall, self.quantity_required) > 0.0
    }
}

/// Counts describing one aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    /// Runs replayed by the allocator (history up to the cutoff).
    pub runs_considered: usize,
    /// Runs that fell inside the window.
    pub runs_in_window: usize,
    /// Batch groups in the report.
    pub groups: usize,
    /// Material lines with a shortfall.
    pub shortfall_lines: usize,
}

/// Build the report for `window` from a full snapshot.
///
/// Runs at or after the window cutoff are ignored. Everything before it is
/// allocated, so runs inside the window see lots consumed by earlier history.
#[must_use]
pub fn build_report(snapshot: &Snapshot, window: &ReportWindow) -> (ReportData, ReportStats) {
    let cutoff = window.cutoff();
    let history: Vec<ProductionRun> = snapshot
        .production_runs
        .iter()
        .filter(|run| run.produced_at < cutoff)
        .cloned()
        .collect();

    let allocations = fifo::allocate(&history, &snapshot.lots);
    let report = aggregate(snapshot, &history, &allocations, window);

    let stats = ReportStats {
        runs_considered: history.len(),
        runs_in_window: report.run_count(),
        groups: report.groups.len(),
        shortfall_lines: report.shortfall_lines(),
    };
    (report, stats)
}

/// Group and order the allocated runs that fall inside `window`.
#[must_use]
pub fn aggregate(
    snapshot: &Snapshot,
    runs: &[ProductionRun],
    allocations: &AllocationMap,
    window: &ReportWindow,
) -> ReportData {
    let mut in_window: Vec<&ProductionRun> = runs
        .iter()
        .filter(|run| window.contains(run.produced_at))
        .collect();
    in_window.sort_by(|a, b| a.produced_at.cmp(&b.produced_at));

    // Runs arrive in timestamp order, so the first run seen for a label
    // carries the group's earliest timestamp.
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(NaiveDateTime, BatchGroup)> = Vec::new();
    for run in in_window {
        let block = run_block(snapshot, run, allocations);
        if let Some((_, group)) = index
            .get(run.batch_label.as_str())
            .and_then(|&slot| groups.get_mut(slot))
        {
            group.runs.push(block);
        } else {
            index.insert(run.batch_label.as_str(), groups.len());
            groups.push((
                run.produced_at,
                BatchGroup {
                    batch_label: run.batch_label.clone(),
                    runs: vec![block],
                },
            ));
        }
    }

    groups.sort_by(|(a_at, a), (b_at, b)| {
        a_at.cmp(b_at)
            .then_with(|| a.batch_label.as_bytes().cmp(b.batch_label.as_bytes()))
    });

    ReportData {
        from: window.from(),
        to: window.to(),
        groups: groups.into_iter().map(|(_, group)| group).collect(),
    }
}

fn run_block(snapshot: &Snapshot, run: &ProductionRun, allocations: &AllocationMap) -> RunBlock {
    let formula_name = snapshot.formulas.get(&run.formula_id).map_or_else(
        || format!("Formula #{}", run.formula_id),
        |formula| formula.name.clone(),
    );
    let per_run = allocations.get(&run.id);

    let lines = run
        .consumption
        .iter()
        .map(|(&material, &required)| {
            let allocation = per_run
                .and_then(|materials| materials.get(&material))
                .cloned()
                .unwrap_or_else(|| MaterialAllocation {
                    usage: LotUsage::NoEligibleLot,
                    draws: Vec::new(),
                    shortfall: required.max(0.0),
                });
            material_line(snapshot, material, required, allocation)
        })
        .collect();

    RunBlock {
        run_id: run.id,
        formula_id: run.formula_id,
        formula_name,
        batch_label: run.batch_label.clone(),
        quantity_produced: run.quantity_produced,
        produced_at: run.produced_at,
        lines,
    }
}

fn material_line(
    snapshot: &Snapshot,
    material: RawMaterialId,
    required: f64,
    allocation: MaterialAllocation,
) -> MaterialLine {
    let (name, unit) = snapshot.raw_materials.get(&material).map_or_else(
        || (format!("Material #{material}"), String::new()),
        |raw| (raw.name.clone(), raw.unit_of_measure.clone()),
    );

    MaterialLine {
        raw_material_id: material,
        name,
        unit,
        lot_usage: allocation.usage.display(),
        quantity_required: required,
        shortfall: allocation.shortfall,
        draws: allocation.draws,
    }
}
