//! Runtime settings.
//!
//! Values come from (lowest to highest precedence): built-in defaults, a
//! `.env` file, process environment, then CLI flags applied by `app`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::{COVERAGE_END, COVERAGE_START};
use crate::error::AppError;

pub const DEFAULT_SOURCE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_daily_reports_us/";
pub const DEFAULT_DATA_DIR: &str = "data";

const ENV_DATA_DIR: &str = "COVID_DATA_DIR";
const ENV_SOURCE_URL: &str = "COVID_SOURCE_URL";
const ENV_START_DATE: &str = "COVID_START_DATE";
const ENV_END_DATE: &str = "COVID_END_DATE";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// Base URL of the daily report directory (must end with `/`).
    pub source_url: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            start_date: COVERAGE_START,
            end_date: COVERAGE_END,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            settings.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(url) = lookup(ENV_SOURCE_URL).filter(|v| !v.trim().is_empty()) {
            settings.source_url = normalize_base_url(&url);
        }
        if let Some(raw) = lookup(ENV_START_DATE).filter(|v| !v.trim().is_empty()) {
            settings.start_date = parse_env_date(ENV_START_DATE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_END_DATE).filter(|v| !v.trim().is_empty()) {
            settings.end_date = parse_env_date(ENV_END_DATE, &raw)?;
        }

        if settings.end_date < settings.start_date {
            return Err(AppError::input(format!(
                "{ENV_END_DATE} ({}) is before {ENV_START_DATE} ({}).",
                settings.end_date, settings.start_date
            )));
        }

        Ok(settings)
    }

    pub fn with_data_dir(mut self, dir: Option<&Path>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir.to_path_buf();
        }
        self
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw").join("daily_reports_us")
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("covid_us_states.csv")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("covid-dash.log")
    }
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn parse_env_date(key: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::input(format!("Invalid {key} '{raw}' (expected YYYY-MM-DD): {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_cover_documented_window() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(s.start_date, NaiveDate::from_ymd_opt(2020, 4, 12).unwrap());
        assert_eq!(s.end_date, NaiveDate::from_ymd_opt(2023, 3, 10).unwrap());
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert!(s.source_url.ends_with("csse_covid_19_daily_reports_us/"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let s = Settings::from_lookup(lookup(&[
            ("COVID_DATA_DIR", "/tmp/covid"),
            ("COVID_SOURCE_URL", "http://localhost:8000/reports"),
            ("COVID_START_DATE", "2021-01-01"),
            ("COVID_END_DATE", "2021-01-31"),
        ]))
        .unwrap();
        assert_eq!(s.raw_dir(), PathBuf::from("/tmp/covid/raw/daily_reports_us"));
        assert_eq!(
            s.artifact_path(),
            PathBuf::from("/tmp/covid/processed/covid_us_states.csv")
        );
        assert_eq!(s.source_url, "http://localhost:8000/reports/");
        assert_eq!(s.start_date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }

    #[test]
    fn blank_entries_fall_back_to_defaults() {
        let s = Settings::from_lookup(lookup(&[
            ("COVID_DATA_DIR", ""),
            ("COVID_SOURCE_URL", "  "),
            ("COVID_START_DATE", ""),
            ("COVID_END_DATE", " "),
        ]))
        .unwrap();
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert_eq!(s.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(s.start_date, COVERAGE_START);
        assert_eq!(s.end_date, COVERAGE_END);
    }

    #[test]
    fn rejects_bad_dates() {
        let err = Settings::from_lookup(lookup(&[("COVID_START_DATE", "03/10/2023")])).unwrap_err();
        assert_eq!(err.exit_code(), 1);

        let err = Settings::from_lookup(lookup(&[
            ("COVID_START_DATE", "2022-01-02"),
            ("COVID_END_DATE", "2022-01-01"),
        ]))
        .unwrap_err();
        assert!(err.message().contains("before"));
    }

    #[test]
    fn cli_data_dir_wins() {
        let s = Settings::default().with_data_dir(Some(Path::new("elsewhere")));
        assert_eq!(s.log_path(), PathBuf::from("elsewhere/covid-dash.log"));
    }
}
