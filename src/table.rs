//! In-memory case table.
//!
//! Holds the whole cleaned dataset for the life of the process. Records are
//! stored sorted by `(state, date)` so every per-state query is a slice.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{DailyStateRecord, UsState};
use crate::error::AppError;
use crate::io::artifact::read_records_csv;

#[derive(Debug, Clone, Default)]
pub struct CaseTable {
    records: Vec<DailyStateRecord>,
    by_state: HashMap<UsState, Range<usize>>,
}

impl CaseTable {
    /// Load the cleaned artifact. A missing or unreadable file is fatal.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let table = Self::from_records(read_records_csv(path)?);
        if table.is_empty() {
            return Err(AppError::no_data(format!(
                "Artifact '{}' contains no records.",
                path.display()
            )));
        }
        if let Some((first, last)) = table.date_range() {
            info!(records = table.len(), %first, %last, "loaded case table");
        }
        Ok(table)
    }

    /// Build a table from records in any order. For duplicate `(state, date)`
    /// keys the last record wins.
    pub fn from_records(mut records: Vec<DailyStateRecord>) -> Self {
        // Stable sort keeps input order among duplicates; keep the last of each run.
        records.sort_by_key(|r| (r.state, r.date));
        let mut deduped: Vec<DailyStateRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.last_mut() {
                Some(prev) if prev.state == record.state && prev.date == record.date => *prev = record,
                _ => deduped.push(record),
            }
        }

        let mut by_state: HashMap<UsState, Range<usize>> = HashMap::new();
        for (i, record) in deduped.iter().enumerate() {
            by_state
                .entry(record.state)
                .and_modify(|r| r.end = i + 1)
                .or_insert(i..i + 1);
        }

        Self {
            records: deduped,
            by_state,
        }
    }

    pub fn records(&self) -> &[DailyStateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// States present in the table, in name order.
    pub fn states(&self) -> Vec<UsState> {
        let mut states: Vec<UsState> = self.by_state.keys().copied().collect();
        states.sort();
        states
    }

    /// Earliest and latest date across all states.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }

    /// All records of one state, oldest first.
    pub fn for_state(&self, state: UsState) -> &[DailyStateRecord] {
        self.by_state
            .get(&state)
            .map(|r| &self.records[r.clone()])
            .unwrap_or(&[])
    }

    /// Records of one state with `start <= date <= end`.
    pub fn for_state_between(&self, state: UsState, start: NaiveDate, end: NaiveDate) -> &[DailyStateRecord] {
        let rows = self.for_state(state);
        if end < start {
            return &[];
        }
        let lo = rows.partition_point(|r| r.date < start);
        let hi = rows.partition_point(|r| r.date <= end);
        &rows[lo..hi]
    }

    /// Records of every state with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&DailyStateRecord> {
        self.records
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect()
    }

    /// One record per state reporting on `date`.
    pub fn on_date(&self, date: NaiveDate) -> Vec<&DailyStateRecord> {
        self.states()
            .into_iter()
            .filter_map(|s| self.get(s, date))
            .collect()
    }

    pub fn get(&self, state: UsState, date: NaiveDate) -> Option<&DailyStateRecord> {
        let rows = self.for_state(state);
        rows.binary_search_by_key(&date, |r| r.date).ok().map(|i| &rows[i])
    }

    /// Most recent record of `state` on or before `date`.
    pub fn latest_for_state(&self, state: UsState, date: NaiveDate) -> Option<&DailyStateRecord> {
        let rows = self.for_state(state);
        let idx = rows.partition_point(|r| r.date <= date);
        idx.checked_sub(1).map(|i| &rows[i])
    }
}
