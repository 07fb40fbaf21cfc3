//! Read/write the cleaned CSV artifact.
//!
//! The artifact is the hand-off between `covid etl` and everything that
//! consumes the table. One header row, then one row per `(state, date)`:
//!
//! `state,date,confirmed,deaths,tests,hospitalizations,incident_rate,hospitalization_rate,new_cases,new_deaths`

use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::Path;

use crate::domain::DailyStateRecord;
use crate::error::AppError;

pub fn write_records_csv(path: &Path, records: &[DailyStateRecord]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create artifact '{}': {e}", path.display())))?;
    write_records(file, records)
}

pub fn write_records<W: Write>(out: W, records: &[DailyStateRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::io(format!("Failed to write artifact row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush artifact: {e}")))
}

pub fn read_records_csv(path: &Path) -> Result<Vec<DailyStateRecord>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::io(format!(
            "Failed to open artifact '{}': {e}. Run `covid etl` first.",
            path.display()
        ))
    })?;
    read_records(file)
}

/// Unlike raw ingest, the artifact is our own format: any bad row is fatal.
pub fn read_records<R: Read>(input: R) -> Result<Vec<DailyStateRecord>, AppError> {
    let mut reader = csv::Reader::from_reader(input);
    let mut out = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let record: DailyStateRecord = result
            .map_err(|e| AppError::io(format!("Invalid artifact row at line {}: {e}", idx + 2)))?;
        out.push(record);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::UsState;

    fn sample() -> Vec<DailyStateRecord> {
        vec![
            DailyStateRecord {
                state: UsState::parse("NY").unwrap(),
                date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                confirmed: 1_011_665,
                deaths: 38_155,
                tests: 25_960_040,
                hospitalizations: 89_995,
                incident_rate: 5200.3,
                hospitalization_rate: 0.0,
                new_cases: 16_497,
                new_deaths: 128,
            },
            DailyStateRecord {
                state: UsState::parse("WY").unwrap(),
                date: NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
                confirmed: 0,
                deaths: 0,
                tests: 0,
                hospitalizations: 0,
                incident_rate: 0.0,
                hospitalization_rate: 12.25,
                new_cases: -4,
                new_deaths: 0,
            },
        ]
    }

    #[test]
    fn header_and_row_layout() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample()[..1]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "state,date,confirmed,deaths,tests,hospitalizations,incident_rate,hospitalization_rate,new_cases,new_deaths\n\
             NY,2021-01-01,1011665,38155,25960040,89995,5200.3,0.0,16497,128\n"
        );
    }

    #[test]
    fn file_round_trip_is_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processed").join("out.csv");
        let records = sample();
        write_records_csv(&path, &records).unwrap();
        assert_eq!(read_records_csv(&path).unwrap(), records);
    }

    #[test]
    fn missing_artifact_points_at_etl() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_records_csv(&tmp.path().join("nope.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("covid etl"));
    }

    #[test]
    fn unknown_state_is_rejected() {
        let text = "state,date,confirmed,deaths,tests,hospitalizations,incident_rate,hospitalization_rate,new_cases,new_deaths\n\
                    PR,2021-01-01,1,0,0,0,0.0,0.0,1,0\n";
        let err = read_records(text.as_bytes()).unwrap_err();
        assert!(err.message().contains("line 2"));
    }
}
