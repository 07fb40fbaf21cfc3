//! Derived metrics, chart series, and formatted terminal output.
//!
//! Everything here is a pure function of the `CaseTable`, so the CLI and the
//! dashboard render identical numbers.

use chrono::{Days, NaiveDate};

use crate::domain::{DailyStateRecord, Metric, UsState};
use crate::table::CaseTable;

pub mod format;

pub use format::*;

/// Window of the trailing new-case average.
pub const AVG_WINDOW: usize = 7;

/// `deaths / confirmed`, clamped to `[0, 1]`; `0.0` when nothing is confirmed.
pub fn case_fatality_rate(record: &DailyStateRecord) -> f64 {
    if record.confirmed == 0 {
        return 0.0;
    }
    (record.deaths as f64 / record.confirmed as f64).clamp(0.0, 1.0)
}

/// Value of `metric` for `rows[idx]`, where `rows` is one state's history in
/// date order (needed for the trailing average).
pub fn metric_at(rows: &[DailyStateRecord], idx: usize, metric: Metric) -> f64 {
    let r = &rows[idx];
    match metric {
        Metric::Confirmed => r.confirmed as f64,
        Metric::Deaths => r.deaths as f64,
        Metric::Tests => r.tests as f64,
        Metric::Hospitalizations => r.hospitalizations as f64,
        Metric::NewCases => r.new_cases as f64,
        Metric::IncidentRate => r.incident_rate,
        Metric::NewCases7d => {
            let lo = (idx + 1).saturating_sub(AVG_WINDOW);
            let window = &rows[lo..=idx];
            window.iter().map(|w| w.new_cases as f64).sum::<f64>() / window.len() as f64
        }
        Metric::FatalityRate => case_fatality_rate(r),
    }
}

/// Value of a single-record metric. The trailing average degrades to the
/// day's own new cases here; use `metric_at` when history is available.
pub fn metric_value(metric: Metric, record: &DailyStateRecord) -> f64 {
    metric_at(std::slice::from_ref(record), 0, metric)
}

/// `(date, value)` series of `metric` for one state, oldest first.
pub fn state_series(table: &CaseTable, state: UsState, metric: Metric) -> Vec<(NaiveDate, f64)> {
    let rows = table.for_state(state);
    (0..rows.len())
        .map(|i| (rows[i].date, metric_at(rows, i, metric)))
        .collect()
}

/// Per-state value of `metric` on `date`, for states that reported that day.
pub fn map_values(table: &CaseTable, date: NaiveDate, metric: Metric) -> Vec<(UsState, f64)> {
    table
        .states()
        .into_iter()
        .filter_map(|state| {
            let rows = table.for_state(state);
            let idx = rows.binary_search_by_key(&date, |r| r.date).ok()?;
            Some((state, metric_at(rows, idx, metric)))
        })
        .collect()
}

/// A headline figure with its change over the previous week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlineFigure {
    pub value: u64,
    /// `None` when there is no record a week earlier.
    pub weekly_change: Option<i64>,
}

/// A reported rate with its change over the previous week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateFigure {
    pub value: f64,
    pub weekly_change: Option<f64>,
}

/// Summary for the dashboard's headline strip and `covid show`.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub state: UsState,
    /// Date of the record used, on or before the requested date.
    pub as_of: NaiveDate,
    pub confirmed: HeadlineFigure,
    pub deaths: HeadlineFigure,
    pub tests: HeadlineFigure,
    pub hospitalizations: HeadlineFigure,
    /// Percent of cases hospitalized.
    pub hospitalization_rate: RateFigure,
    /// Cases per 100,000 residents.
    pub incident_rate: f64,
    pub fatality_rate: f64,
    pub new_cases_7d: f64,
}

pub fn headline(table: &CaseTable, state: UsState, date: NaiveDate) -> Option<Headline> {
    let rows = table.for_state(state);
    let idx = rows.partition_point(|r| r.date <= date).checked_sub(1)?;
    let latest = &rows[idx];
    let week_ago = latest
        .date
        .checked_sub_days(Days::new(7))
        .and_then(|d| table.latest_for_state(state, d));

    let figure = |f: fn(&DailyStateRecord) -> u64| HeadlineFigure {
        value: f(latest),
        weekly_change: week_ago.map(|w| f(latest) as i64 - f(w) as i64),
    };

    Some(Headline {
        state,
        as_of: latest.date,
        confirmed: figure(|r| r.confirmed),
        deaths: figure(|r| r.deaths),
        tests: figure(|r| r.tests),
        hospitalizations: figure(|r| r.hospitalizations),
        hospitalization_rate: RateFigure {
            value: latest.hospitalization_rate,
            weekly_change: week_ago.map(|w| latest.hospitalization_rate - w.hospitalization_rate),
        },
        incident_rate: latest.incident_rate,
        fatality_rate: case_fatality_rate(latest),
        new_cases_7d: metric_at(rows, idx, Metric::NewCases7d),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn rec(state: &str, date: NaiveDate, confirmed: u64, deaths: u64, new_cases: i64) -> DailyStateRecord {
        DailyStateRecord {
            state: UsState::parse(state).unwrap(),
            date,
            confirmed,
            deaths,
            tests: confirmed * 10,
            hospitalizations: 7,
            incident_rate: 0.0,
            hospitalization_rate: 0.0,
            new_cases,
            new_deaths: 0,
        }
    }

    fn ny_table() -> CaseTable {
        // 10 days of NY, confirmed grows by 10/day from 100.
        let mut records: Vec<DailyStateRecord> = (1..=10)
            .map(|i| rec("NY", d(i), 100 + 10 * (i as u64 - 1), i as u64, if i == 1 { 100 } else { 10 }))
            .collect();
        records.push(rec("CA", d(5), 500, 5, 500));
        CaseTable::from_records(records)
    }

    #[test]
    fn fatality_rate_is_bounded_and_defined() {
        let zero = rec("NY", d(1), 0, 0, 0);
        assert_eq!(case_fatality_rate(&zero), 0.0);

        let odd = rec("NY", d(1), 0, 12, 0);
        assert_eq!(case_fatality_rate(&odd), 0.0);

        let bad = rec("NY", d(1), 10, 25, 0);
        assert_eq!(case_fatality_rate(&bad), 1.0);

        let normal = rec("NY", d(1), 1000, 25, 0);
        let cfr = case_fatality_rate(&normal);
        assert!((cfr - 0.025).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&cfr));
    }

    #[test]
    fn trailing_average_uses_partial_windows() {
        let t = ny_table();
        let ny = UsState::parse("NY").unwrap();
        let series = state_series(&t, ny, Metric::NewCases7d);
        assert_eq!(series.len(), 10);
        // day 1: only itself
        assert!((series[0].1 - 100.0).abs() < 1e-9);
        // day 2: (100 + 10) / 2
        assert!((series[1].1 - 55.0).abs() < 1e-9);
        // day 8: window days 2..=8 are all 10
        assert!((series[7].1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn map_values_only_include_reporting_states() {
        let t = ny_table();
        let values = map_values(&t, d(5), Metric::Confirmed);
        let abbrs: Vec<&str> = values.iter().map(|(s, _)| s.abbr()).collect();
        assert_eq!(abbrs, vec!["CA", "NY"]);
        assert_eq!(values[1].1, 140.0);

        assert_eq!(map_values(&t, d(6), Metric::Confirmed).len(), 1);
        assert!(map_values(&t, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), Metric::Confirmed).is_empty());
    }

    #[test]
    fn headline_reports_weekly_change() {
        let t = ny_table();
        let ny = UsState::parse("NY").unwrap();
        let h = headline(&t, ny, d(9)).unwrap();
        assert_eq!(h.as_of, d(9));
        assert_eq!(h.confirmed.value, 180);
        assert_eq!(h.confirmed.weekly_change, Some(70));
        assert_eq!(h.deaths.weekly_change, Some(7));
        assert_eq!(h.hospitalizations.weekly_change, Some(0));

        let early = headline(&t, ny, d(3)).unwrap();
        assert_eq!(early.confirmed.weekly_change, None);

        // Requested date past the end falls back to the latest record.
        let late = headline(&t, ny, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()).unwrap();
        assert_eq!(late.as_of, d(10));

        assert!(headline(&t, ny, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()).is_none());
    }

    #[test]
    fn metric_value_matches_fields() {
        let r = rec("NY", d(1), 200, 4, 20);
        assert_eq!(metric_value(Metric::Confirmed, &r), 200.0);
        assert_eq!(metric_value(Metric::Tests, &r), 2000.0);
        assert_eq!(metric_value(Metric::NewCases, &r), 20.0);
        assert_eq!(metric_value(Metric::NewCases7d, &r), 20.0);
        assert!((metric_value(Metric::FatalityRate, &r) - 0.02).abs() < 1e-12);

        let mut per_capita = r.clone();
        per_capita.incident_rate = 760.7;
        assert_eq!(metric_value(Metric::IncidentRate, &per_capita), 760.7);
    }

    #[test]
    fn headline_carries_rates() {
        let ny = UsState::parse("NY").unwrap();
        let mut first = rec("NY", d(1), 100, 1, 100);
        first.hospitalization_rate = 12.0;
        let mut last = rec("NY", d(8), 170, 2, 70);
        last.hospitalization_rate = 10.5;
        last.incident_rate = 8.7;
        let t = CaseTable::from_records(vec![first, last]);

        let h = headline(&t, ny, d(8)).unwrap();
        assert_eq!(h.incident_rate, 8.7);
        assert_eq!(h.hospitalization_rate.value, 10.5);
        assert_eq!(h.hospitalization_rate.weekly_change, Some(-1.5));
    }
}
