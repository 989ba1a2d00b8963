//! Allocation and aggregation over a realistic plant history.

#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]

use chrono::{FixedOffset, NaiveDate};
use lotwise_core::{
    NO_ELIGIBLE_LOT, Normalizer, RawSnapshot, ReportData, ReportWindow, build_report,
};
use lotwise_integration_tests::{sample_snapshot, utc};
use serde_json::json;

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn report(from: &str, to: &str, offset: FixedOffset) -> ReportData {
    let raw: RawSnapshot = serde_json::from_value(sample_snapshot()).unwrap();
    let snapshot = Normalizer::new(offset).normalize(&raw);
    let window = ReportWindow::new(day(from), day(to)).unwrap();
    build_report(&snapshot, &window).0
}

#[test]
fn test_june_report_reflects_may_consumption() {
    let report = report("2025-06-01", "2025-06-30", utc());

    let labels: Vec<&str> = report.groups.iter().map(|g| g.batch_label.as_str()).collect();
    assert_eq!(labels, ["L1", "L0"]);

    // Run 1 (May) left 20 in lot A, so run 2 spills over into B.
    let run2 = &report.groups[0].runs[0];
    assert_eq!(run2.formula_name, "Syrup");
    assert_eq!(run2.lines[0].name, "Sugar");
    assert_eq!(run2.lines[0].lot_usage, "A/B");
    assert_eq!(run2.lines[0].draws[0].quantity, 20.0);
    assert_eq!(run2.lines[0].draws[1].quantity, 20.0);
    assert_eq!(run2.lines[0].shortfall, 0.0);
}

#[test]
fn test_partial_cover_keeps_lots_and_records_shortfall() {
    let report = report("2025-06-01", "2025-06-30", utc());

    let salt = &report.groups[0].runs[0].lines[1];
    assert_eq!(salt.unit, "g");
    assert_eq!(salt.lot_usage, "S1");
    assert_eq!(salt.quantity_required, 10.0);
    assert_eq!(salt.shortfall, 4.0);
}

#[test]
fn test_exact_fractional_cover_is_not_a_shortfall() {
    let raw: RawSnapshot = serde_json::from_value(json!({
        "raw_materials": [{"id": 1, "name": "Yeast", "unit_of_measure": "kg"}],
        "formulas": [{"id": 1, "name": "Dough"}],
        "lots": [{"id": 1, "raw_material_id": 1, "lot_number": "A",
                  "quantity_received": 0.3, "received_at": "2025-05-01"}],
        "production_runs": [
            {"id": 1, "formula_id": 1, "batch_label": "D1", "quantity_produced": 1,
             "produced_at": "2025-05-20T08:00:00Z", "raw_materials_consumed": {"1": 0.1}},
            {"id": 2, "formula_id": 1, "batch_label": "D2", "quantity_produced": 1,
             "produced_at": "2025-06-02T08:00:00Z", "raw_materials_consumed": {"1": 0.2}}
        ]
    }))
    .unwrap();
    let snapshot = Normalizer::new(utc()).normalize(&raw);
    let window = ReportWindow::new(day("2025-06-01"), day("2025-06-30")).unwrap();

    let (report, stats) = build_report(&snapshot, &window);

    let line = &report.groups[0].runs[0].lines[0];
    assert_eq!(line.lot_usage, "A");
    assert_eq!(line.shortfall, 0.0);
    assert!(!line.has_shortfall());
    assert_eq!(stats.shortfall_lines, 0);
}

#[test]
fn test_material_without_lots_uses_sentinel() {
    let report = report("2025-06-01", "2025-06-30", utc());

    let run3 = &report.groups[1].runs[0];
    assert_eq!(run3.lines[0].lot_usage, "B");
    assert_eq!(run3.lines[1].name, "Water");
    assert_eq!(run3.lines[1].lot_usage, NO_ELIGIBLE_LOT);
    assert_eq!(run3.lines[1].shortfall, 2.0);
    assert!(run3.lines[1].draws.is_empty());

    assert_eq!(report.shortfall_lines(), 2);
}

#[test]
fn test_single_day_window_still_replays_history() {
    let report = report("2025-06-04", "2025-06-04", utc());

    assert_eq!(report.run_count(), 1);
    let run3 = &report.groups[0].runs[0];
    assert_eq!(run3.batch_label, "L0");
    // Lot A was exhausted on June 3.
    assert_eq!(run3.lines[0].lot_usage, "B");
}

#[test]
fn test_run_on_cutoff_belongs_to_next_window() {
    let june = report("2025-06-01", "2025-06-30", utc());
    assert!(june.groups.iter().all(|g| g.batch_label != "L9"));

    let july = report("2025-07-01", "2025-07-31", utc());
    assert_eq!(july.run_count(), 1);
    assert_eq!(july.groups[0].batch_label, "L9");
    assert_eq!(july.groups[0].runs[0].lines[0].lot_usage, "B");
}

#[test]
fn test_offset_moves_runs_across_day_boundaries() {
    // 2025-07-01T00:00Z is still June 30 at UTC-03:00.
    let offset = FixedOffset::west_opt(3 * 3600).unwrap();
    let june = report("2025-06-01", "2025-06-30", offset);

    assert_eq!(june.run_count(), 3);
    assert!(june.groups.iter().any(|g| g.batch_label == "L9"));
}

#[test]
fn test_empty_window_has_no_groups() {
    let report = report("2025-01-01", "2025-01-31", utc());

    assert!(report.is_empty());
    assert_eq!(report.shortfall_lines(), 0);
}

#[test]
fn test_reports_are_identical_across_builds() {
    let first = report("2025-05-01", "2025-06-30", utc());
    let second = report("2025-05-01", "2025-06-30", utc());

    assert_eq!(first, second);
}
