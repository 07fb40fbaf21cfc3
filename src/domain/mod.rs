//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the 50 US states and their tile-map positions (`UsState`)
//! - the cleaned per-state daily record (`DailyStateRecord`)
//! - the metric selector shared by the CLI and the dashboard (`Metric`)

pub mod states;
pub mod types;

pub use states::*;
pub use types::*;
