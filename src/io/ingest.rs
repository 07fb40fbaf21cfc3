//! Raw daily report ingest and normalization.
//!
//! This module turns a directory of provider CSVs into flat, state-level rows.
//!
//! Design goals:
//! - **Tolerant schema**: the provider added and dropped columns over the years;
//!   only `Province_State` and `Confirmed` are required per file
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: files are parsed in parallel but merged in date order
//! - **Separation of concerns**: no aggregation logic here

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::data::jhu::date_from_file_name;
use crate::domain::UsState;
use crate::error::AppError;

const COL_STATE: &str = "province_state";
const COL_CONFIRMED: &str = "confirmed";
const COL_DEATHS: &str = "deaths";
const COL_TESTS: &str = "total_test_results";
const COL_TESTS_LEGACY: &str = "people_tested";
const COL_HOSPITALIZED: &str = "people_hospitalized";
const COL_INCIDENT_RATE: &str = "incident_rate";
const COL_HOSPITALIZATION_RATE: &str = "hospitalization_rate";

/// Largest count accepted from a report. Anything above is treated as a
/// corrupt value rather than coerced.
pub const MAX_COUNT: u64 = 1 << 53;

/// One state's counts as reported in a single daily file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub state: UsState,
    pub date: NaiveDate,
    pub confirmed: u64,
    pub deaths: u64,
    pub tests: u64,
    pub hospitalizations: u64,
    /// Cases per 100,000 residents.
    pub incident_rate: f64,
    /// Percent of cases hospitalized.
    pub hospitalization_rate: f64,
}

/// A row- or file-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub file: String,
    /// 1-based line number; `1` refers to the header.
    pub line: usize,
    pub message: String,
}

/// Ingest output for a single report file.
#[derive(Debug, Clone, Default)]
pub struct ReportIngest {
    pub rows: Vec<RawRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows for regions that are not one of the 50 states.
    pub rows_filtered: usize,
    /// The file was unusable (missing required columns) and contributed no rows.
    pub skipped: bool,
}

/// Ingest output for a whole raw directory.
#[derive(Debug, Clone, Default)]
pub struct IngestedData {
    pub rows: Vec<RawRow>,
    pub row_errors: Vec<RowError>,
    pub files_read: usize,
    pub files_skipped: usize,
    pub rows_read: usize,
    pub rows_filtered: usize,
}

impl IngestedData {
    fn absorb(&mut self, report: ReportIngest) {
        self.files_read += 1;
        if report.skipped {
            self.files_skipped += 1;
        }
        self.rows_read += report.rows_read;
        self.rows_filtered += report.rows_filtered;
        self.rows.extend(report.rows);
        self.row_errors.extend(report.row_errors);
    }
}

/// Report files in `dir`, ordered by report date. Other files are ignored.
pub fn list_report_files(dir: &Path) -> Result<Vec<(NaiveDate, PathBuf)>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::io(format!("Failed to read raw dir '{}': {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::io(format!("Failed to read raw dir entry: {e}")))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().and_then(date_from_file_name) {
            Some(date) => files.push((date, path)),
            None => debug!(file = %path.display(), "ignoring non-report file"),
        }
    }
    files.sort_by_key(|(date, _)| *date);
    Ok(files)
}

/// Parse every report under `dir`.
pub fn read_raw_dir(dir: &Path) -> Result<IngestedData, AppError> {
    let files = list_report_files(dir)?;
    if files.is_empty() {
        return Err(AppError::no_data(format!(
            "No daily reports found in '{}'. Run `covid fetch` first.",
            dir.display()
        )));
    }

    let reports = files
        .par_iter()
        .map(|(date, path)| read_report_file(path, *date))
        .collect::<Result<Vec<_>, AppError>>()?;

    let mut out = IngestedData::default();
    for report in reports {
        out.absorb(report);
    }
    Ok(out)
}

pub fn read_report_file(path: &Path, date: NaiveDate) -> Result<ReportIngest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open report '{}': {e}", path.display())))?;
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(parse_report(file, date, &label))
}

/// Parse one daily report. Never fails: problems are reported in the result.
pub fn parse_report<R: Read>(input: R, date: NaiveDate, label: &str) -> ReportIngest {
    let mut out = ReportIngest::default();

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            out.skipped = true;
            out.row_errors.push(RowError {
                file: label.to_string(),
                line: 1,
                message: format!("Failed to read CSV headers: {e}"),
            });
            return out;
        }
    };
    let header_map = build_header_map(&headers);
    let width = headers.len();

    if let Err(message) = ensure_required_columns_exist(&header_map) {
        warn!(file = label, %message, "skipping report");
        out.skipped = true;
        out.row_errors.push(RowError {
            file: label.to_string(),
            line: 1,
            message,
        });
        return out;
    }

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        out.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                out.row_errors.push(RowError {
                    file: label.to_string(),
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if record.len() < width {
            out.row_errors.push(RowError {
                file: label.to_string(),
                line,
                message: format!("Expected {width} fields, found {}", record.len()),
            });
            continue;
        }

        match parse_row(&record, &header_map, date) {
            Ok(Some(row)) => out.rows.push(row),
            Ok(None) => out.rows_filtered += 1,
            Err(message) => out.row_errors.push(RowError {
                file: label.to_string(),
                line,
                message,
            }),
        }
    }

    out
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Some exports prefix the first header with a UTF-8 BOM; without stripping
    // it `Province_State` would never match.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), String> {
    let missing: Vec<&str> = [COL_STATE, COL_CONFIRMED]
        .into_iter()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Missing required column(s): {}", missing.join(", ")))
    }
}

/// `Ok(None)` means the region is not one of the 50 states.
fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    date: NaiveDate,
) -> Result<Option<RawRow>, String> {
    let region = get_required(record, header_map, COL_STATE)?;
    let Some(state) = UsState::from_name(region).or_else(|| UsState::from_abbr(region)) else {
        return Ok(None);
    };

    let tests = if header_map.contains_key(COL_TESTS) {
        get_optional(record, header_map, COL_TESTS)
    } else {
        get_optional(record, header_map, COL_TESTS_LEGACY)
    };

    let count = |col: &str, raw: Option<&str>| {
        coerce_count(raw).map_err(|e| format!("`{col}`: {e}"))
    };

    Ok(Some(RawRow {
        state,
        date,
        confirmed: count(COL_CONFIRMED, get_optional(record, header_map, COL_CONFIRMED))?,
        deaths: count(COL_DEATHS, get_optional(record, header_map, COL_DEATHS))?,
        tests: count(COL_TESTS, tests)?,
        hospitalizations: count(COL_HOSPITALIZED, get_optional(record, header_map, COL_HOSPITALIZED))?,
        incident_rate: coerce_rate(get_optional(record, header_map, COL_INCIDENT_RATE)),
        hospitalization_rate: coerce_rate(get_optional(record, header_map, COL_HOSPITALIZATION_RATE)),
    }))
}

/// Missing, non-numeric, non-finite and negative values become `0`.
/// Values above [`MAX_COUNT`] are an error.
pub fn coerce_count(s: Option<&str>) -> Result<u64, String> {
    let Some(s) = s else { return Ok(0) };
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => {
            let v = v.round();
            if v > MAX_COUNT as f64 {
                Err(format!("value {s} is out of range"))
            } else {
                Ok(v as u64)
            }
        }
        _ => Ok(0),
    }
}

/// Same policy as [`coerce_count`] for rate columns, without the upper bound.
pub fn coerce_rate(s: Option<&str>) -> f64 {
    match s.map(str::parse::<f64>) {
        Some(Ok(v)) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
    }

    const MODERN: &str = "\
Province_State,Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active,FIPS,Incident_Rate,Total_Test_Results,People_Hospitalized,Case_Fatality_Ratio
Alabama,US,2021-01-02 05:30:44,32.3182,-86.9023,361226,4872,,,1,7367.0,1919731,,1.35
American Samoa,US,,,,0,0,,,60,0,2140,,
Diamond Princess,US,,,,49,0,,,88888,,,,0
District of Columbia,US,,,,29252,785,,,11,4144.8,714133,,2.68
New York,US,2021-01-02 05:30:44,42.1657,-74.9481,1011665,38155,,,36,5200.3,25960040,,3.77
";

    #[test]
    fn keeps_only_the_fifty_states() {
        let out = parse_report(MODERN.as_bytes(), day(), "01-01-2021.csv");
        assert!(!out.skipped);
        assert_eq!(out.rows_read, 5);
        assert_eq!(out.rows_filtered, 3);
        assert!(out.row_errors.is_empty());

        let states: Vec<&str> = out.rows.iter().map(|r| r.state.abbr()).collect();
        assert_eq!(states, vec!["AL", "NY"]);

        let ny = &out.rows[1];
        assert_eq!(ny.date, day());
        assert_eq!(ny.confirmed, 1_011_665);
        assert_eq!(ny.deaths, 38_155);
        assert_eq!(ny.tests, 25_960_040);
        assert_eq!(ny.hospitalizations, 0);
        assert_eq!(ny.incident_rate, 5200.3);
        assert_eq!(ny.hospitalization_rate, 0.0);
    }

    #[test]
    fn falls_back_to_legacy_test_column() {
        let csv = "\
\u{feff}Province_State,Confirmed,Deaths,People_Tested,People_Hospitalized
Texas,13906.0,287,136194.0,1338
";
        let out = parse_report(csv.as_bytes(), day(), "x.csv");
        assert_eq!(out.rows.len(), 1);
        let tx = &out.rows[0];
        assert_eq!(tx.state.abbr(), "TX");
        assert_eq!(tx.confirmed, 13_906);
        assert_eq!(tx.tests, 136_194);
        assert_eq!(tx.hospitalizations, 1_338);
    }

    #[test]
    fn coerces_bad_numbers_to_zero() {
        let csv = "\
Province_State,Confirmed,Deaths
Ohio,n/a,-3
Utah,12.6,
";
        let out = parse_report(csv.as_bytes(), day(), "x.csv");
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].confirmed, 0);
        assert_eq!(out.rows[0].deaths, 0);
        assert_eq!(out.rows[1].confirmed, 13);
        assert_eq!(out.rows[1].deaths, 0);
    }

    #[test]
    fn huge_counts_are_rejected() {
        let csv = "\
Province_State,Confirmed,Deaths
Ohio,1e20,3
Ohio,5,1
Utah,12,1e300
";
        let out = parse_report(csv.as_bytes(), day(), "01-01-2021.csv");
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].confirmed, 5);
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.row_errors[0].line, 2);
        assert!(out.row_errors[0].message.contains("confirmed"), "{:?}", out.row_errors[0]);
        assert_eq!(out.row_errors[1].line, 4);
        assert!(out.row_errors[1].message.contains("deaths"));

        assert_eq!(coerce_count(Some("9007199254740992")), Ok(MAX_COUNT));
        assert!(coerce_count(Some("1e20")).is_err());
        assert_eq!(coerce_count(Some("inf")), Ok(0));
    }

    #[test]
    fn truncated_rows_are_reported() {
        let csv = "\
Province_State,Country_Region,Confirmed,Deaths
Ohio,US
Ohio,US,120,4
";
        let out = parse_report(csv.as_bytes(), day(), "01-01-2021.csv");
        assert_eq!(out.rows_read, 2);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].confirmed, 120);
        assert_eq!(out.row_errors.len(), 1);
        assert_eq!(out.row_errors[0].line, 2);
        assert!(out.row_errors[0].message.contains("Expected 4 fields, found 2"));
    }

    #[test]
    fn reads_rate_columns() {
        let csv = "\
Province_State,Confirmed,Incident_Rate,Hospitalization_Rate
Iowa,24000,760.7,7.5
Ohio,1000,NaN,-1
";
        let out = parse_report(csv.as_bytes(), day(), "x.csv");
        assert_eq!(out.rows[0].incident_rate, 760.7);
        assert_eq!(out.rows[0].hospitalization_rate, 7.5);
        assert_eq!(out.rows[1].incident_rate, 0.0);
        assert_eq!(out.rows[1].hospitalization_rate, 0.0);
    }

    #[test]
    fn reports_rows_without_a_region() {
        let csv = "\
Province_State,Confirmed
,10
Iowa,5
";
        let out = parse_report(csv.as_bytes(), day(), "01-01-2021.csv");
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.row_errors.len(), 1);
        let err = &out.row_errors[0];
        assert_eq!(err.file, "01-01-2021.csv");
        assert_eq!(err.line, 2);
        assert!(err.message.contains("province_state"));
    }

    #[test]
    fn skips_files_without_required_columns() {
        let csv = "Country_Region,Confirmed\nUS,1\n";
        let out = parse_report(csv.as_bytes(), day(), "bad.csv");
        assert!(out.skipped);
        assert!(out.rows.is_empty());
        assert_eq!(out.row_errors[0].line, 1);
        assert!(out.row_errors[0].message.contains("province_state"));
    }

    #[test]
    fn reads_directory_in_date_order() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("01-02-2021.csv"), "Province_State,Confirmed\nNew York,20\n").unwrap();
        fs::write(tmp.path().join("12-31-2020.csv"), "Province_State,Confirmed\nNew York,5\n").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let data = read_raw_dir(tmp.path()).unwrap();
        assert_eq!(data.files_read, 2);
        let dates: Vec<NaiveDate> = data.rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn empty_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_raw_dir(tmp.path()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
