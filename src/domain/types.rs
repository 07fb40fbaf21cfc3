//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by the ETL step
//! - written to / read back from the cleaned CSV artifact
//! - queried by the dashboard and the `show` command

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::states::UsState;

/// First day the provider published US state-level daily reports.
pub const COVERAGE_START: NaiveDate = match NaiveDate::from_ymd_opt(2020, 4, 12) {
    Some(d) => d,
    None => panic!("invalid coverage start"),
};

/// Documented end of the dataset ("10/03/2023", read day-first).
pub const COVERAGE_END: NaiveDate = match NaiveDate::from_ymd_opt(2023, 3, 10) {
    Some(d) => d,
    None => panic!("invalid coverage end"),
};

/// One cleaned row: a state's cumulative counts on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStateRecord {
    pub state: UsState,
    pub date: NaiveDate,
    pub confirmed: u64,
    pub deaths: u64,
    pub tests: u64,
    pub hospitalizations: u64,
    /// Cases per 100,000 residents, as reported.
    pub incident_rate: f64,
    /// Percent of cases hospitalized, as reported (0 once the provider stopped publishing it).
    pub hospitalization_rate: f64,
    /// `confirmed` minus the previous record's `confirmed` for the same state.
    /// Equals `confirmed` on a state's first record; may be negative after revisions.
    pub new_cases: i64,
    pub new_deaths: i64,
}

/// Metric shown on the map / charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Confirmed,
    Deaths,
    Tests,
    Hospitalizations,
    NewCases,
    /// Trailing 7-day mean of `new_cases`.
    #[value(name = "new-cases-7d")]
    #[serde(rename = "new-cases-7d")]
    NewCases7d,
    /// Cases per 100,000 residents.
    IncidentRate,
    FatalityRate,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Confirmed,
        Metric::Deaths,
        Metric::Tests,
        Metric::Hospitalizations,
        Metric::NewCases,
        Metric::NewCases7d,
        Metric::IncidentRate,
        Metric::FatalityRate,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Confirmed => "Confirmed",
            Metric::Deaths => "Deaths",
            Metric::Tests => "Tests",
            Metric::Hospitalizations => "Hospitalizations",
            Metric::NewCases => "New cases",
            Metric::NewCases7d => "New cases (7d avg)",
            Metric::IncidentRate => "Cases per 100k",
            Metric::FatalityRate => "Fatality rate",
        }
    }

    /// Ratio metrics are formatted as percentages rather than counts.
    pub fn is_ratio(self) -> bool {
        matches!(self, Metric::FatalityRate)
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}
