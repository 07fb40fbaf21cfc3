//! Dashboard rendering.

use chrono::NaiveDate;
use plotters::style::RGBColor;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};

use super::choropleth::ChoroplethMap;
use super::plotters_chart::{ChartLine, TimeSeriesChart};
use super::{App, Field};
use crate::domain::{DailyStateRecord, Metric};
use crate::report::{self, HeadlineFigure, format_change, format_number, format_percent, format_points};

const CYAN: RGBColor = RGBColor(0, 255, 255);
const RED: RGBColor = RGBColor(255, 80, 80);
const LIGHT_BLUE: RGBColor = RGBColor(110, 160, 255);
const MAGENTA: RGBColor = RGBColor(200, 120, 255);
const YELLOW: RGBColor = RGBColor(255, 220, 0);

/// One chart panel: title, the metrics it overlays, and their colors.
struct Panel {
    title: &'static str,
    lines: &'static [(Metric, RGBColor)],
}

const PANELS: [Panel; 4] = [
    Panel {
        title: "Cumulative cases / deaths",
        lines: &[(Metric::Confirmed, CYAN), (Metric::Deaths, RED)],
    },
    Panel {
        title: "Daily new cases / 7-day avg",
        lines: &[(Metric::NewCases, LIGHT_BLUE), (Metric::NewCases7d, CYAN)],
    },
    Panel {
        title: "Tests / hospitalizations",
        lines: &[(Metric::Tests, MAGENTA), (Metric::Hospitalizations, YELLOW)],
    },
    Panel {
        title: "Case fatality rate",
        lines: &[(Metric::FatalityRate, RED)],
    },
];

impl App {
    pub(super) fn draw(&self, frame: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let selector = |field: Field, label: &str, value: String| -> Vec<Span<'static>> {
            let style = if self.field == field {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            vec![
                Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
                Span::styled(format!(" {value} "), style),
                Span::raw("   "),
            ]
        };

        let date_value = if self.editing_date {
            format!("{}_", self.date_input)
        } else {
            self.date.to_string()
        };

        let mut spans = Vec::new();
        spans.extend(selector(Field::State, "State", format!("{} ({})", self.state.name(), self.state.abbr())));
        spans.extend(selector(Field::Metric, "Metric", self.metric.display_name().to_string()));
        spans.extend(selector(Field::Date, "Date", date_value));

        let lines = vec![
            Line::from(vec![
                Span::styled("covid", Style::default().fg(Color::Cyan)),
                Span::raw(format!(
                    " | US COVID-19 by state | data {} .. {}",
                    self.bounds.0, self.bounds.1
                )),
            ]),
            Line::from(spans),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(10), Constraint::Length(11)])
            .split(columns[0]);

        self.draw_map(frame, left[0]);
        self.draw_headline(frame, left[1]);
        if self.show_table {
            self.draw_records(frame, columns[1]);
        } else {
            self.draw_charts(frame, columns[1]);
        }
    }

    fn draw_map(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = format!("{} by state, {}", self.metric.display_name(), self.date);
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let values = report::map_values(&self.table, self.date, self.metric);
        frame.render_widget(
            ChoroplethMap {
                values: &values,
                selected: self.state,
                metric: self.metric,
            },
            inner,
        );
    }

    fn draw_headline(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default().title(self.state.name()).borders(Borders::ALL);
        let Some(h) = report::headline(&self.table, self.state, self.date) else {
            let p = Paragraph::new("No records on or before this date.")
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(p, area);
            return;
        };

        let figure = |label: &str, f: &HeadlineFigure, up_is_bad: bool| -> Line<'static> {
            let change_style = match f.weekly_change {
                Some(c) if (c > 0) == up_is_bad && c != 0 => Style::default().fg(Color::Red),
                Some(_) => Style::default().fg(Color::Green),
                None => Style::default().fg(Color::DarkGray),
            };
            Line::from(vec![
                Span::styled(format!("{label:<18}"), Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("{:>8}", format_number(f.value as f64)),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "  {}",
                        f.weekly_change
                            .map(|c| format!("{} (7d)", format_change(c)))
                            .unwrap_or_else(|| "-".to_string())
                    ),
                    change_style,
                ),
            ])
        };

        let lines = vec![
            Line::from(Span::styled(
                format!("as of {}", h.as_of),
                Style::default().fg(Color::DarkGray),
            )),
            figure("Total cases", &h.confirmed, true),
            figure("Deaths", &h.deaths, true),
            figure("Tests", &h.tests, false),
            figure("Hospitalizations", &h.hospitalizations, true),
            Line::from(vec![
                Span::styled(format!("{:<18}", "Hospitalized rate"), Style::default().fg(Color::Gray)),
                Span::raw(format!("{:>8}", format!("{:.2}%", h.hospitalization_rate.value))),
                Span::styled(
                    format!(
                        "  {}",
                        h.hospitalization_rate
                            .weekly_change
                            .map(|c| format!("{} (7d)", format_points(c)))
                            .unwrap_or_else(|| "-".to_string())
                    ),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            Line::from(vec![
                Span::styled(format!("{:<18}", "Cases per 100k"), Style::default().fg(Color::Gray)),
                Span::raw(format!("{:>8.1}", h.incident_rate)),
            ]),
            Line::from(vec![
                Span::styled(format!("{:<18}", "New cases (7d)"), Style::default().fg(Color::Gray)),
                Span::raw(format!("{:>8}", format_number(h.new_cases_7d))),
            ]),
            Line::from(vec![
                Span::styled(format!("{:<18}", "Fatality rate"), Style::default().fg(Color::Gray)),
                Span::raw(format!("{:>8}", format_percent(h.fatality_rate))),
            ]),
        ];
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_charts(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let mut cells = Vec::with_capacity(4);
        for row in rows.iter() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row);
            cells.extend(cols.iter().copied());
        }

        for (panel, cell) in PANELS.iter().zip(cells) {
            self.draw_panel(frame, panel, cell);
        }
    }

    fn draw_panel(&self, frame: &mut Frame<'_>, panel: &Panel, area: Rect) {
        let origin = self.bounds.0;
        let series: Vec<(Metric, RGBColor, Vec<(NaiveDate, f64)>)> = panel
            .lines
            .iter()
            .map(|&(metric, color)| (metric, color, report::state_series(&self.table, self.state, metric)))
            .collect();

        let legend = series
            .iter()
            .map(|(metric, _, s)| {
                let latest = s
                    .iter()
                    .take_while(|(d, _)| *d <= self.date)
                    .last()
                    .map(|&(_, v)| report::format_metric(*metric, v))
                    .unwrap_or_else(|| "-".to_string());
                format!("{} {latest}", metric.display_name())
            })
            .collect::<Vec<_>>()
            .join(" | ");

        let block = Block::default()
            .title(Line::from(vec![
                Span::raw(panel.title),
                Span::styled(format!("  {legend}"), Style::default().fg(Color::DarkGray)),
            ]))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let lines: Vec<ChartLine> = series
            .into_iter()
            .map(|(_, color, s)| ChartLine {
                points: s
                    .into_iter()
                    .map(|(d, v)| ((d - origin).num_days() as f64, v))
                    .collect(),
                color,
            })
            .collect();

        if lines.iter().all(|l| l.points.is_empty()) {
            let msg = Paragraph::new("No data for this state.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let x_bounds = [0.0, ((self.bounds.1 - origin).num_days() as f64).max(1.0)];
        let y_bounds = y_bounds(&lines);
        let fmt_y: fn(f64) -> String = if panel.lines.iter().any(|(m, _)| m.is_ratio()) {
            format_percent
        } else {
            format_number
        };

        frame.render_widget(
            TimeSeriesChart {
                lines: &lines,
                x_origin: origin,
                x_bounds,
                y_bounds,
                marker: Some((self.date - origin).num_days() as f64),
                fmt_y,
            },
            inner,
        );
    }

    fn draw_records(&self, frame: &mut Frame<'_>, area: Rect) {
        let visible = area.height.saturating_sub(3) as usize;
        let rows: Vec<&DailyStateRecord> = self
            .table
            .for_state(self.state)
            .iter()
            .filter(|r| r.date <= self.date)
            .rev()
            .take(visible)
            .collect();

        let header = Row::new(["date", "confirmed", "deaths", "tests", "hospital", "new", "cfr"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let body = rows.into_iter().map(|r| {
            Row::new(vec![
                Cell::from(r.date.to_string()),
                Cell::from(r.confirmed.to_string()),
                Cell::from(r.deaths.to_string()),
                Cell::from(r.tests.to_string()),
                Cell::from(r.hospitalizations.to_string()),
                Cell::from(r.new_cases.to_string()),
                Cell::from(format_percent(report::case_fatality_rate(r))),
            ])
        });

        let widths = [
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(11),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(7),
        ];
        let table = Table::new(body, widths).header(header).block(
            Block::default()
                .title(format!("{} records up to {}", self.state.abbr(), self.date))
                .borders(Borders::ALL),
        );
        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let help = "↑/↓ field  ←/→ adjust  PgUp/PgDn ±30d  Home/End  Enter date  s state  m metric  t table  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn y_bounds(lines: &[ChartLine]) -> [f64; 2] {
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in lines.iter().flat_map(|l| l.points.iter()) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        return [0.0, 1.0];
    }
    if y_max <= y_min {
        return [y_min - 1.0, y_max + 1.0];
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    [y_min - pad, y_max + pad]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn y_bounds_pad_and_fallback() {
        let flat = [ChartLine {
            points: vec![(0.0, 5.0), (1.0, 5.0)],
            color: RED,
        }];
        assert_eq!(y_bounds(&flat), [4.0, 6.0]);

        let ramp = [ChartLine {
            points: vec![(0.0, 0.0), (1.0, 100.0)],
            color: RED,
        }];
        assert_eq!(y_bounds(&ramp), [-5.0, 105.0]);

        assert_eq!(y_bounds(&[]), [0.0, 1.0]);
    }
}
