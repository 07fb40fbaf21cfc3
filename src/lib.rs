//! `covid-dash` library crate.
//!
//! The binary (`covid`) is a thin wrapper around this library so that:
//!
//! - fetch, ETL and query logic is testable without spawning processes
//! - the dashboard and the plain-text `show` command share one query layer

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod etl;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod table;
pub mod tui;
