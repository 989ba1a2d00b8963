//! FIFO lot allocation.
//!
//! Reconstructs which received lots each production run drew from. Every run
//! in the supplied history is replayed in production order against
//! per-material queues of lots ordered by receipt, so the result for a run
//! depends on everything consumed before it, not only on runs in a report
//! window.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::{Lot, ProductionRun};
use crate::types::{LotId, ProductionRunId, RawMaterialId};

/// Display text for a material line no lot could cover.
pub const NO_ELIGIBLE_LOT: &str = "[no eligible lot]";

/// Uncovered quantity left after drawing, with float residue snapped to zero.
///
/// Exact cover can leave a remainder in the order of `f64::EPSILON` times the
/// requirement (0.3 received, 0.1 then 0.2 drawn). That is not a shortfall.
#[must_use]
pub fn uncovered(remaining: f64, required: f64) -> f64 {
    if remaining > f64::EPSILON * required.abs().max(1.0) {
        remaining
    } else {
        0.0
    }
}

/// Which lots a run/material pair was served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "lots", rename_all = "snake_case")]
pub enum LotUsage {
    /// Lot numbers in the order they were first drawn from, without repeats.
    Lots(Vec<String>),
    /// Nothing was drawn: no lots existed or every balance was already zero.
    NoEligibleLot,
}

impl LotUsage {
    /// Human-readable form: lot numbers joined with `/`, or the sentinel text.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Lots(numbers) => numbers.join("/"),
            Self::NoEligibleLot => NO_ELIGIBLE_LOT.to_string(),
        }
    }
}

/// A single draw from one lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotDraw {
    /// Lot drawn from.
    pub lot_id: LotId,
    /// Lot number of that lot.
    pub lot_number: String,
    /// Quantity taken.
    pub quantity: f64,
}

/// Allocation outcome for one raw material of one production run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialAllocation {
    /// Lots that covered the consumption.
    pub usage: LotUsage,
    /// Individual draws in queue order.
    pub draws: Vec<LotDraw>,
    /// Quantity required that no lot could cover.
    pub shortfall: f64,
}

impl MaterialAllocation {
    /// Total quantity drawn across all lots.
    #[must_use]
    pub fn drawn(&self) -> f64 {
        self.draws.iter().map(|draw| draw.quantity).sum()
    }

    /// Whether part of the requirement went uncovered.
    #[must_use]
    pub fn has_shortfall(&self) -> bool {
        uncovered(self.shortfall, self.drawn() + self.shortfall) > 0.0
    }
}

/// Allocation results for every run in the history.
pub type AllocationMap = HashMap<ProductionRunId, BTreeMap<RawMaterialId, MaterialAllocation>>;

/// A lot waiting in a material's queue.
#[derive(Debug, Clone)]
struct LotQueueItem {
    lot_id: LotId,
    lot_number: String,
    received_at: NaiveDateTime,
    balance: f64,
}

impl LotQueueItem {
    fn from_lot(lot: &Lot) -> Self {
        Self {
            lot_id: lot.id,
            lot_number: lot.lot_number.clone(),
            received_at: lot.received_at,
            balance: lot.quantity_received.max(0.0),
        }
    }
}

/// Per-invocation queues, one per raw material, oldest lot first.
#[derive(Debug, Default)]
struct LotQueues {
    queues: HashMap<RawMaterialId, Vec<LotQueueItem>>,
}

impl LotQueues {
    fn build(lots: &[Lot]) -> Self {
        let mut queues: HashMap<RawMaterialId, Vec<LotQueueItem>> = HashMap::new();
        for lot in lots {
            queues
                .entry(lot.raw_material_id)
                .or_default()
                .push(LotQueueItem::from_lot(lot));
        }
        // sort_by is stable: lots received at the same instant keep load order.
        for queue in queues.values_mut() {
            queue.sort_by(|a, b| a.received_at.cmp(&b.received_at));
        }
        Self { queues }
    }

    /// Drain up to `required` from a material's queue, oldest first.
    fn draw(&mut self, material: RawMaterialId, required: f64) -> MaterialAllocation {
        let mut remaining = required;
        let mut draws = Vec::new();
        let mut lot_numbers: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if let Some(queue) = self.queues.get_mut(&material) {
            for item in queue.iter_mut() {
                if remaining <= 0.0 {
                    break;
                }
                if item.balance <= 0.0 {
                    continue;
                }

                let take = item.balance.min(remaining);
                item.balance -= take;
                remaining -= take;

                if take > 0.0 {
                    if seen.insert(item.lot_number.clone()) {
                        lot_numbers.push(item.lot_number.clone());
                    }
                    draws.push(LotDraw {
                        lot_id: item.lot_id,
                        lot_number: item.lot_number.clone(),
                        quantity: take,
                    });
                }
            }
        }

        let usage = if lot_numbers.is_empty() {
            LotUsage::NoEligibleLot
        } else {
            LotUsage::Lots(lot_numbers)
        };

        MaterialAllocation {
            usage,
            draws,
            shortfall: uncovered(remaining, required),
        }
    }
}

/// Allocate every run's consumption to lots, oldest receipt first.
///
/// Runs are replayed in ascending production timestamp; runs sharing a
/// timestamp keep their order in `runs`. Shortfalls are recorded on the
/// result, never raised.
#[must_use]
pub fn allocate(runs: &[ProductionRun], lots: &[Lot]) -> AllocationMap {
    let mut queues = LotQueues::build(lots);

    let mut ordered: Vec<&ProductionRun> = runs.iter().collect();
    ordered.sort_by(|a, b| a.produced_at.cmp(&b.produced_at));

    let mut result = AllocationMap::with_capacity(ordered.len());
    let mut shortfalls = 0usize;

    for run in ordered {
        let mut per_material = BTreeMap::new();
        for (&material, &required) in &run.consumption {
            let allocation = queues.draw(material, required);
            if allocation.has_shortfall() {
                shortfalls += 1;
                tracing::debug!(
                    run_id = %run.id,
                    raw_material_id = %material,
                    required,
                    shortfall = allocation.shortfall,
                    "Lot supply did not cover consumption"
                );
            }
            per_material.insert(material, allocation);
        }
        // A repeated run id keeps only the latest run's allocations.
        result.insert(run.id, per_material);
    }

    tracing::debug!(
        runs = result.len(),
        lots = lots.len(),
        shortfalls,
        "FIFO allocation complete"
    );

    result
}
