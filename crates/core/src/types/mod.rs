//! Core types for Lotwise.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod timestamp;

pub use id::*;
pub use timestamp::parse_timestamp;
