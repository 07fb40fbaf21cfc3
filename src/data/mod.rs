//! Remote data acquisition.

pub mod jhu;

pub use jhu::{DayOutcome, FetchSummary, JhuClient};
