//! JHU CSSE US daily report downloads.
//!
//! The provider publishes one CSV per day, named `MM-DD-YYYY.csv`. Files are
//! stored verbatim under the raw directory with the same name.

use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::error::AppError;

const FILE_DATE_FORMAT: &str = "%m-%d-%Y";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw file name for a report date.
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{}.csv", date.format(FILE_DATE_FORMAT))
}

/// Report date encoded in a raw file name, if it follows the provider's scheme.
pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".csv")?;
    NaiveDate::parse_from_str(stem, FILE_DATE_FORMAT).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    Downloaded,
    AlreadyPresent,
    /// The provider has no report for this day (HTTP 404).
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub already_present: usize,
    pub missing: Vec<NaiveDate>,
}

impl FetchSummary {
    pub fn record(&mut self, date: NaiveDate, outcome: DayOutcome) {
        match outcome {
            DayOutcome::Downloaded => self.downloaded += 1,
            DayOutcome::AlreadyPresent => self.already_present += 1,
            DayOutcome::Missing => self.missing.push(date),
        }
    }

    pub fn files_available(&self) -> usize {
        self.downloaded + self.already_present
    }
}

pub struct JhuClient {
    client: Client,
    base_url: String,
}

impl JhuClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        format!("{}{}", self.base_url, file_name_for(date))
    }

    /// Download every day in `start..=end` into `raw_dir`.
    ///
    /// Days already on disk are skipped unless `force`. Days the provider does
    /// not publish are recorded as missing; any other failure aborts.
    pub fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        raw_dir: &Path,
        force: bool,
    ) -> Result<FetchSummary, AppError> {
        if end < start {
            return Err(AppError::input(format!("End date {end} is before start date {start}.")));
        }
        create_dir_all(raw_dir)
            .map_err(|e| AppError::io(format!("Failed to create raw dir '{}': {e}", raw_dir.display())))?;

        let mut summary = FetchSummary::default();
        for date in start.iter_days().take_while(|d| *d <= end) {
            let outcome = self.fetch_day(date, raw_dir, force)?;
            summary.record(date, outcome);
        }

        info!(
            downloaded = summary.downloaded,
            already_present = summary.already_present,
            missing = summary.missing.len(),
            "fetch completed"
        );

        if summary.files_available() == 0 {
            return Err(AppError::no_data(format!(
                "No data was downloaded for {start}..={end}."
            )));
        }
        Ok(summary)
    }

    pub fn fetch_day(&self, date: NaiveDate, raw_dir: &Path, force: bool) -> Result<DayOutcome, AppError> {
        let target = raw_dir.join(file_name_for(date));
        if !force && target.is_file() {
            debug!(%date, "already present");
            return Ok(DayOutcome::AlreadyPresent);
        }

        let url = self.url_for(date);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::runtime(format!("Request for {url} failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            warn!(%date, "no report published");
            return Ok(DayOutcome::Missing);
        }
        if !resp.status().is_success() {
            return Err(AppError::runtime(format!(
                "Request for {url} failed with status {}.",
                resp.status()
            )));
        }

        let body = resp
            .bytes()
            .map_err(|e| AppError::runtime(format!("Failed to read body of {url}: {e}")))?;
        write_verbatim(&target, &body)?;
        info!(%date, bytes = body.len(), "downloaded");
        Ok(DayOutcome::Downloaded)
    }
}

/// Write through a `.part` file; a report only appears under its final name
/// once complete.
fn write_verbatim(target: &Path, body: &[u8]) -> Result<(), AppError> {
    let mut part = PathBuf::from(target);
    part.set_extension("csv.part");
    fs::write(&part, body)
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", part.display())))?;
    fs::rename(&part, target)
        .map_err(|e| AppError::io(format!("Failed to move '{}' into place: {e}", target.display())))
}
