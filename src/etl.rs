//! Reshape ingested rows into per-state daily records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::{DailyStateRecord, UsState};
use crate::io::ingest::RawRow;

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    confirmed: u64,
    deaths: u64,
    tests: u64,
    hospitalizations: u64,
    incident_rate: f64,
    hospitalization_rate: f64,
}

impl Totals {
    fn add(&mut self, row: &RawRow) {
        self.confirmed = self.confirmed.saturating_add(row.confirmed);
        self.deaths = self.deaths.saturating_add(row.deaths);
        self.tests = self.tests.saturating_add(row.tests);
        self.hospitalizations = self.hospitalizations.saturating_add(row.hospitalizations);
        // Rates do not add up across duplicate rows.
        self.incident_rate = self.incident_rate.max(row.incident_rate);
        self.hospitalization_rate = self.hospitalization_rate.max(row.hospitalization_rate);
    }
}

/// Aggregate to one record per `(state, date)` and derive daily changes.
///
/// Output is sorted by state, then date. Duplicate rows for the same state
/// and day are summed.
pub fn transform(rows: &[RawRow]) -> Vec<DailyStateRecord> {
    let mut grouped: BTreeMap<(UsState, NaiveDate), Totals> = BTreeMap::new();
    for row in rows {
        grouped.entry((row.state, row.date)).or_default().add(row);
    }

    let mut out = Vec::with_capacity(grouped.len());
    let mut prev: Option<(UsState, Totals)> = None;
    for ((state, date), t) in grouped {
        let (prev_confirmed, prev_deaths) = match prev {
            Some((s, p)) if s == state => (p.confirmed, p.deaths),
            _ => (0, 0),
        };
        let record = DailyStateRecord {
            state,
            date,
            confirmed: t.confirmed,
            deaths: t.deaths,
            tests: t.tests,
            hospitalizations: t.hospitalizations,
            incident_rate: t.incident_rate,
            hospitalization_rate: t.hospitalization_rate,
            new_cases: signed_diff(t.confirmed, prev_confirmed),
            new_deaths: signed_diff(t.deaths, prev_deaths),
        };
        if deaths_exceed_confirmed(&record) {
            warn!(%state, %date, deaths = record.deaths, confirmed = record.confirmed, "deaths exceed confirmed cases");
        }
        out.push(record);
        prev = Some((state, t));
    }
    out
}

/// A record the provider reported with more deaths than cases.
pub fn deaths_exceed_confirmed(record: &DailyStateRecord) -> bool {
    record.deaths > record.confirmed
}

fn signed_diff(current: u64, previous: u64) -> i64 {
    let current = i64::try_from(current).unwrap_or(i64::MAX);
    let previous = i64::try_from(previous).unwrap_or(i64::MAX);
    current.saturating_sub(previous)
}
