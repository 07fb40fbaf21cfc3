//! Ratatui-based dashboard.
//!
//! The dashboard provides selectors for state, metric and date, then renders a
//! choropleth of all states plus time-series charts for the selected state.

use std::io;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, info};

use crate::cli::DashArgs;
use crate::domain::{Metric, UsState};
use crate::error::AppError;
use crate::table::CaseTable;

mod choropleth;
mod draw;
mod plotters_chart;

/// Days moved by PgUp / PgDn.
const PAGE_DAYS: u64 = 30;

/// Start the dashboard over an already loaded table.
pub fn run(table: CaseTable, args: &DashArgs) -> Result<(), AppError> {
    let mut app = App::new(table, args.state, args.metric, args.date)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    info!(state = %app.state, metric = ?app.metric, date = %app.date, "dashboard started");
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    State,
    Metric,
    Date,
}

impl Field {
    const ALL: [Field; 3] = [Field::State, Field::Metric, Field::Date];

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

struct App {
    table: CaseTable,
    bounds: (NaiveDate, NaiveDate),
    state: UsState,
    metric: Metric,
    date: NaiveDate,
    field: Field,
    editing_date: bool,
    date_input: String,
    show_table: bool,
    status: String,
}

impl App {
    fn new(table: CaseTable, state: UsState, metric: Metric, date: Option<NaiveDate>) -> Result<Self, AppError> {
        let bounds = table
            .date_range()
            .ok_or_else(|| AppError::no_data("Case table is empty."))?;
        let mut app = Self {
            table,
            bounds,
            state,
            metric,
            date: bounds.1,
            field: Field::State,
            editing_date: false,
            date_input: String::new(),
            show_table: false,
            status: String::new(),
        };
        if let Some(d) = date {
            app.set_date(d);
        }
        app.status = format!("Data covers {} .. {}", bounds.0, bounds.1);
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        info!("dashboard closed");
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_date {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                let i = self.field.index();
                self.field = Field::ALL[(i + Field::ALL.len() - 1) % Field::ALL.len()];
            }
            KeyCode::Down | KeyCode::Tab => {
                let i = self.field.index();
                self.field = Field::ALL[(i + 1) % Field::ALL.len()];
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::PageUp => self.shift_date(-(PAGE_DAYS as i64)),
            KeyCode::PageDown => self.shift_date(PAGE_DAYS as i64),
            KeyCode::Home => self.set_date(self.bounds.0),
            KeyCode::End => self.set_date(self.bounds.1),
            KeyCode::Enter => {
                self.editing_date = true;
                self.date_input.clear();
                self.status = "Editing date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
            }
            KeyCode::Char('s') => self.set_state(self.state.next()),
            KeyCode::Char('S') => self.set_state(self.state.prev()),
            KeyCode::Char('m') => self.set_metric(self.metric.next()),
            KeyCode::Char('M') => self.set_metric(self.metric.prev()),
            KeyCode::Char('t') => {
                self.show_table = !self.show_table;
                self.status = if self.show_table { "Showing records." } else { "Showing charts." }.to_string();
            }
            _ => {}
        }
        false
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_date = false;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_date = false;
                self.apply_date_input();
            }
            KeyCode::Backspace => {
                self.date_input.pop();
            }
            KeyCode::Char(c) => {
                if (c.is_ascii_digit() || c == '-') && self.date_input.len() < 10 {
                    self.date_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn apply_date_input(&mut self) {
        let trimmed = self.date_input.trim().to_string();
        match NaiveDate::parse_from_str(&trimmed, "%Y-%m-%d") {
            Ok(d) => self.set_date(d),
            Err(e) => self.status = format!("Invalid date '{trimmed}': {e}"),
        }
    }

    fn adjust_field(&mut self, delta: i64) {
        match self.field {
            Field::State => {
                let next = if delta >= 0 { self.state.next() } else { self.state.prev() };
                self.set_state(next);
            }
            Field::Metric => {
                let next = if delta >= 0 { self.metric.next() } else { self.metric.prev() };
                self.set_metric(next);
            }
            Field::Date => self.shift_date(delta),
        }
    }

    fn set_state(&mut self, state: UsState) {
        self.state = state;
        self.status = format!("state: {}", state.name());
        debug!(%state, "state selected");
    }

    fn set_metric(&mut self, metric: Metric) {
        self.metric = metric;
        self.status = format!("metric: {}", metric.display_name());
    }

    fn shift_date(&mut self, days: i64) {
        let moved = if days >= 0 {
            self.date.checked_add_days(Days::new(days as u64))
        } else {
            self.date.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        if let Some(d) = moved {
            self.set_date(d);
        }
    }

    /// Select `date`, clamped into the covered range.
    fn set_date(&mut self, date: NaiveDate) {
        let clamped = date.clamp(self.bounds.0, self.bounds.1);
        self.date = clamped;
        self.status = if clamped == date {
            format!("date: {clamped}")
        } else {
            format!("{date} is outside the data; showing {clamped}")
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyStateRecord;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, day).unwrap()
    }

    fn app() -> App {
        let records = (1..=31)
            .map(|day| DailyStateRecord {
                state: UsState::parse("NY").unwrap(),
                date: d(1, day),
                confirmed: day as u64 * 100,
                deaths: day as u64,
                tests: day as u64 * 1000,
                hospitalizations: 0,
                incident_rate: 0.0,
                hospitalization_rate: 0.0,
                new_cases: 100,
                new_deaths: 1,
            })
            .collect();
        App::new(
            CaseTable::from_records(records),
            UsState::parse("NY").unwrap(),
            Metric::Confirmed,
            None,
        )
        .unwrap()
    }

    #[test]
    fn starts_on_latest_date() {
        let app = app();
        assert_eq!(app.date, d(1, 31));
        assert_eq!(app.bounds, (d(1, 1), d(1, 31)));
    }

    #[test]
    fn date_is_clamped_to_coverage() {
        let mut app = app();
        app.handle_key(KeyCode::PageDown);
        assert_eq!(app.date, d(1, 31));
        app.handle_key(KeyCode::PageUp);
        assert_eq!(app.date, d(1, 1));
        app.field = Field::Date;
        app.handle_key(KeyCode::Right);
        assert_eq!(app.date, d(1, 2));
        app.handle_key(KeyCode::End);
        assert_eq!(app.date, d(1, 31));
    }

    #[test]
    fn typed_dates_apply_or_report() {
        let mut app = app();
        app.handle_key(KeyCode::Enter);
        for c in "2021-01-15".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.date, d(1, 15));

        app.handle_key(KeyCode::Enter);
        for c in "2024-01-01".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.date, d(1, 31));
        assert!(app.status.contains("outside"));

        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Char('x'));
        app.handle_key(KeyCode::Char('1'));
        app.handle_key(KeyCode::Enter);
        assert!(app.status.starts_with("Invalid date"));
        assert_eq!(app.date, d(1, 31));
    }

    #[test]
    fn selectors_cycle() {
        let mut app = app();
        assert_eq!(app.field, Field::State);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.state.abbr(), "NC");
        app.handle_key(KeyCode::Left);
        assert_eq!(app.state.abbr(), "NY");

        app.handle_key(KeyCode::Down);
        assert_eq!(app.field, Field::Metric);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.metric, Metric::FatalityRate);

        app.handle_key(KeyCode::Char('t'));
        assert!(app.show_table);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn initial_date_argument_is_clamped() {
        let records = vec![DailyStateRecord {
            state: UsState::parse("TX").unwrap(),
            date: d(3, 1),
            confirmed: 1,
            deaths: 0,
            tests: 0,
            hospitalizations: 0,
            incident_rate: 0.0,
            hospitalization_rate: 0.0,
            new_cases: 1,
            new_deaths: 0,
        }];
        let app = App::new(
            CaseTable::from_records(records),
            UsState::parse("TX").unwrap(),
            Metric::Deaths,
            Some(d(1, 1)),
        )
        .unwrap();
        assert_eq!(app.date, d(3, 1));
    }
}
