//! Lotwise Core - FIFO lot traceability engine.
//!
//! Turns a snapshot of production and lot-receipt history into a production
//! report. Shared between:
//! - `server` - HTTP service that fetches snapshots from `PostgreSQL`
//! - `cli` - Command-line report generation and migrations
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Data sources, renderers and storage live in the server
//! crate and feed this one.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and timestamp parsing
//! - [`model`] - Canonical entities
//! - [`normalize`] - Loosely typed rows to canonical entities
//! - [`fifo`] - Oldest-lot-first allocation over full history
//! - [`window`] - Inclusive calendar-day report windows
//! - [`report`] - Grouping and ordering into report structures

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fifo;
pub mod model;
pub mod normalize;
pub mod report;
pub mod types;
pub mod window;

pub use fifo::{
    AllocationMap, LotDraw, LotUsage, MaterialAllocation, NO_ELIGIBLE_LOT, allocate, uncovered,
};
pub use model::{Formula, FormulaComponent, Lot, ProductionRun, RawMaterial, Snapshot};
pub use normalize::{Normalizer, RawSnapshot};
pub use report::{BatchGroup, MaterialLine, ReportData, ReportStats, RunBlock, build_report};
pub use types::*;
pub use window::{ReportWindow, WindowError};
