//! Lotwise report server.
//!
//! Generates FIFO lot traceability reports for production runs: which
//! received lots each run's raw materials were drawn from, grouped by
//! production batch and rendered as a printable sheet or JSON.
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` (or a JSON snapshot file) as the report data source
//! - Askama templates for the printable HTML sheet
//! - Optional local storage of generated reports
//!
//! The allocation engine itself lives in `lotwise-core` and is pure.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod render;
pub mod routes;
pub mod service;
pub mod source;
pub mod state;
pub mod storage;
