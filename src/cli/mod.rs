//! Command-line parsing for the COVID-19 dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the ETL and query code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{Metric, UsState};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "covid", version, about = "US COVID-19 state dashboard (JHU CSSE daily reports)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download raw daily reports into the data directory.
    Fetch(FetchArgs),
    /// Clean the raw reports and write the per-state artifact.
    Etl(DataArgs),
    /// Print one state's figures, records, and a plot.
    Show(ShowArgs),
    /// Launch the interactive dashboard (default).
    Dash(DashArgs),
}

/// Options shared by every command.
#[derive(Debug, Args, Clone, Default)]
pub struct DataArgs {
    /// Data directory (raw reports, artifact, logs). Overrides COVID_DATA_DIR.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// First report date (YYYY-MM-DD). Defaults to the start of coverage.
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Last report date (YYYY-MM-DD). Defaults to the end of coverage.
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Re-download files that are already present.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// State abbreviation or name.
    #[arg(short = 's', long, value_parser = parse_state)]
    pub state: UsState,

    /// Metric to plot.
    #[arg(short = 'm', long, value_enum, default_value_t = Metric::Confirmed)]
    pub metric: Metric,

    /// Headline date (YYYY-MM-DD). Defaults to the latest available.
    #[arg(short = 'd', long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// First date of the listed records / plot.
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Last date of the listed records / plot.
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// Number of most recent records to list.
    #[arg(long, default_value_t = 10)]
    pub rows: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct DashArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Initially selected state.
    #[arg(short = 's', long, value_parser = parse_state, default_value = "NY")]
    pub state: UsState,

    /// Initially selected metric.
    #[arg(short = 'm', long, value_enum, default_value_t = Metric::Confirmed)]
    pub metric: Metric,

    /// Initially selected date. Defaults to the latest available.
    #[arg(short = 'd', long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}

pub fn parse_state(s: &str) -> Result<UsState, String> {
    s.parse()
}
