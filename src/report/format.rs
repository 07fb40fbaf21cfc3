//! Terminal formatting.
//!
//! We keep formatting code in one place so:
//! - the ETL and query code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::EtlSummary;
use crate::data::FetchSummary;
use crate::domain::{DailyStateRecord, Metric};
use crate::report::{Headline, HeadlineFigure, RateFigure, case_fatality_rate};

/// Compact count: `950`, `1.2K`, `3.4M`, `1.0B`.
pub fn format_number(v: f64) -> String {
    let abs = v.abs();
    let sign = if v < 0.0 { "-" } else { "" };
    if abs >= 1e9 {
        format!("{sign}{:.1}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{sign}{:.1}M", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{sign}{:.1}K", abs / 1e3)
    } else {
        format!("{sign}{abs:.0}")
    }
}

pub fn format_change(v: i64) -> String {
    let n = format_number(v as f64);
    if v > 0 { format!("+{n}") } else { n }
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// Format a value of `metric` for display.
pub fn format_metric(metric: Metric, v: f64) -> String {
    match metric {
        Metric::IncidentRate => format!("{v:.1}"),
        m if m.is_ratio() => format_percent(v),
        _ => format_number(v),
    }
}

fn format_figure(label: &str, f: &HeadlineFigure) -> String {
    let change = f
        .weekly_change
        .map(|c| format!("{} (7d)", format_change(c)))
        .unwrap_or_else(|| "-".to_string());
    format!("{label:<18}{:>10}  {change}\n", format_number(f.value as f64))
}

/// Percentage-point change: `+0.50pp`.
pub fn format_points(v: f64) -> String {
    format!("{v:+.2}pp")
}

fn format_rate_figure(label: &str, f: &RateFigure) -> String {
    let change = f
        .weekly_change
        .map(|c| format!("{} (7d)", format_points(c)))
        .unwrap_or_else(|| "-".to_string());
    format!("{label:<18}{:>10}  {change}\n", format!("{:.2}%", f.value))
}

pub fn format_headline(h: &Headline) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ({}) as of {} ===\n", h.state.name(), h.state.abbr(), h.as_of));
    out.push_str(&format_figure("Total cases", &h.confirmed));
    out.push_str(&format_figure("Deaths", &h.deaths));
    out.push_str(&format_figure("Tests", &h.tests));
    out.push_str(&format_figure("Hospitalizations", &h.hospitalizations));
    out.push_str(&format_rate_figure("Hospitalized rate", &h.hospitalization_rate));
    out.push_str(&format!("{:<18}{:>10}\n", "Cases per 100k", format!("{:.1}", h.incident_rate)));
    out.push_str(&format!("{:<18}{:>10}\n", "New cases (7d avg)", format_number(h.new_cases_7d)));
    out.push_str(&format!("{:<18}{:>10}\n", "Fatality rate", format_percent(h.fatality_rate)));
    out
}

/// Table of records, one per line, in the order given.
pub fn format_records(records: &[DailyStateRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<5} {:<10} {:>12} {:>10} {:>14} {:>10} {:>9} {:>8}\n",
        "state", "date", "confirmed", "deaths", "tests", "hospital", "new", "cfr"
    ));
    for r in records {
        out.push_str(&format!(
            "{:<5} {:<10} {:>12} {:>10} {:>14} {:>10} {:>9} {:>8}\n",
            r.state.abbr(),
            r.date,
            r.confirmed,
            r.deaths,
            r.tests,
            r.hospitalizations,
            r.new_cases,
            format_percent(case_fatality_rate(r)),
        ));
    }
    out
}

pub fn format_fetch_summary(s: &FetchSummary) -> String {
    let mut out = String::new();
    out.push_str("=== covid fetch ===\n");
    out.push_str(&format!("Downloaded: {}\n", s.downloaded));
    out.push_str(&format!("Already present: {}\n", s.already_present));
    out.push_str(&format!("Not published: {}\n", s.missing.len()));
    if let (Some(first), Some(last)) = (s.missing.first(), s.missing.last()) {
        out.push_str(&format!("  first missing: {first}, last missing: {last}\n"));
    }
    out
}

/// Show at most this many row errors before summarizing the rest.
const MAX_LISTED_ERRORS: usize = 10;

pub fn format_etl_summary(s: &EtlSummary) -> String {
    let mut out = String::new();
    out.push_str("=== covid etl ===\n");
    out.push_str(&format!(
        "Files: {} read, {} skipped\n",
        s.files_read, s.files_skipped
    ));
    out.push_str(&format!(
        "Rows: {} read, {} used, {} non-state, {} rejected\n",
        s.rows_read,
        s.rows_used,
        s.rows_filtered,
        s.row_errors.len()
    ));
    out.push_str(&format!("Records written: {}\n", s.records_written));
    if let Some((first, last)) = s.date_range {
        out.push_str(&format!("Coverage: {first} .. {last}\n"));
    }
    out.push_str(&format!("Artifact: {}\n", s.artifact.display()));

    for e in s.row_errors.iter().take(MAX_LISTED_ERRORS) {
        out.push_str(&format!("  {}:{}: {}\n", e.file, e.line, e.message));
    }
    if s.row_errors.len() > MAX_LISTED_ERRORS {
        out.push_str(&format!(
            "  ... and {} more\n",
            s.row_errors.len() - MAX_LISTED_ERRORS
        ));
    }
    out
}
