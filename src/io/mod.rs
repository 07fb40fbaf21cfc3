//! Input/output helpers.
//!
//! - raw daily report ingest + validation (`ingest`)
//! - cleaned artifact read/write (`artifact`)

pub mod artifact;
pub mod ingest;

pub use artifact::*;
pub use ingest::*;
