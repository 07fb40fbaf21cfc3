//! Shared pipeline logic used by both the CLI and the TUI front-ends.
//!
//! fetch -> ingest -> transform -> artifact -> table
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::Settings;
use crate::data::{FetchSummary, JhuClient};
use crate::error::AppError;
use crate::io::artifact::write_records_csv;
use crate::io::ingest::{RowError, read_raw_dir};
use crate::table::CaseTable;

/// Outcome of one `covid etl` run.
#[derive(Debug, Clone)]
pub struct EtlSummary {
    pub files_read: usize,
    pub files_skipped: usize,
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_filtered: usize,
    pub row_errors: Vec<RowError>,
    pub records_written: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub artifact: PathBuf,
}

/// Download raw reports for `start..=end` (defaults from `settings`).
pub fn run_fetch(
    settings: &Settings,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    force: bool,
) -> Result<FetchSummary, AppError> {
    let start = start.unwrap_or(settings.start_date);
    let end = end.unwrap_or(settings.end_date);
    info!(%start, %end, source = %settings.source_url, "fetching daily reports");

    let client = JhuClient::new(settings.source_url.clone())?;
    client.fetch_range(start, end, &settings.raw_dir(), force)
}

/// Transform everything under the raw dir into the cleaned artifact.
pub fn run_etl(settings: &Settings) -> Result<EtlSummary, AppError> {
    run_etl_paths(&settings.raw_dir(), &settings.artifact_path())
}

pub fn run_etl_paths(raw_dir: &Path, artifact: &Path) -> Result<EtlSummary, AppError> {
    info!(raw_dir = %raw_dir.display(), "reading raw reports");
    let ingest = read_raw_dir(raw_dir)?;
    for e in &ingest.row_errors {
        warn!(file = %e.file, line = e.line, "{}", e.message);
    }

    let records = crate::etl::transform(&ingest.rows);
    if records.is_empty() {
        return Err(AppError::no_data(
            "No state-level rows remain after cleaning the raw reports.",
        ));
    }

    write_records_csv(artifact, &records)?;
    let table = CaseTable::from_records(records);
    info!(records = table.len(), artifact = %artifact.display(), "wrote artifact");

    Ok(EtlSummary {
        files_read: ingest.files_read,
        files_skipped: ingest.files_skipped,
        rows_read: ingest.rows_read,
        rows_used: ingest.rows.len(),
        rows_filtered: ingest.rows_filtered,
        row_errors: ingest.row_errors,
        records_written: table.len(),
        date_range: table.date_range(),
        artifact: artifact.to_path_buf(),
    })
}

/// Load the cleaned table for the presentation layer.
pub fn load_table(settings: &Settings) -> Result<CaseTable, AppError> {
    CaseTable::load(&settings.artifact_path())
}
