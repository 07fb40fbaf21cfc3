//! Tile-grid choropleth of the 50 states.
//!
//! Each state is one cell on an 8x11 grid; the cell background is picked from
//! a 5-step red scale by the state's value relative to the day's min/max.

use std::collections::HashMap;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::domain::{Metric, TILE_COLS, TILE_ROWS, UsState};
use crate::report::format_metric;

/// Light to dark.
pub const REDS: [(u8, u8, u8); 5] = [
    (254, 229, 217),
    (252, 174, 145),
    (251, 106, 74),
    (222, 45, 38),
    (165, 15, 21),
];

const NO_DATA: Color = Color::DarkGray;

/// Bin `v` into `0..REDS.len()` on the linear scale `[min, max]`.
pub fn shade_bin(v: f64, min: f64, max: f64) -> usize {
    let top = REDS.len() - 1;
    if !(v.is_finite() && min.is_finite() && max.is_finite()) {
        return 0;
    }
    if max <= min {
        return if v > 0.0 { top } else { 0 };
    }
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    ((u * REDS.len() as f64) as usize).min(top)
}

pub struct ChoroplethMap<'a> {
    pub values: &'a [(UsState, f64)],
    pub selected: UsState,
    pub metric: Metric,
}

impl ChoroplethMap<'_> {
    fn min_max(&self) -> Option<(f64, f64)> {
        let mut it = self.values.iter().map(|(_, v)| *v).filter(|v| v.is_finite());
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

impl Widget for ChoroplethMap<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let legend_rows = 1u16;
        let tile_w = (area.width / TILE_COLS as u16).min(8);
        let tile_h = (area.height.saturating_sub(legend_rows) / TILE_ROWS as u16).min(2);
        if tile_w < 3 || tile_h < 1 {
            buf.set_string(
                area.x,
                area.y,
                "Map area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let lookup: HashMap<UsState, f64> = self.values.iter().copied().collect();
        let range = self.min_max();

        for state in UsState::all() {
            let tile = state.tile();
            let x = area.x + tile.col as u16 * tile_w;
            let y = area.y + tile.row as u16 * tile_h;

            let (bg, fg) = match (lookup.get(&state), range) {
                (Some(&v), Some((lo, hi))) => {
                    let bin = shade_bin(v, lo, hi);
                    let (r, g, b) = REDS[bin];
                    let fg = if bin >= 2 { Color::White } else { Color::Black };
                    (Color::Rgb(r, g, b), fg)
                }
                _ => (NO_DATA, Color::Gray),
            };

            let mut style = Style::default().bg(bg).fg(fg);
            if state == self.selected {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }

            // Leave a one-column gap between tiles.
            let inner_w = tile_w - 1;
            for dy in 0..tile_h {
                buf.set_string(x, y + dy, " ".repeat(inner_w as usize), style);
            }
            let label = if state == self.selected && inner_w >= 4 {
                format!("[{}]", state.abbr())
            } else {
                state.abbr().to_string()
            };
            let pad = inner_w.saturating_sub(label.len() as u16) / 2;
            buf.set_string(x + pad, y, &label, style);
        }

        let legend_y = area.y + TILE_ROWS as u16 * tile_h;
        if legend_y < area.y + area.height {
            let legend = match range {
                Some((lo, hi)) => format!(
                    "{}: {} .. {}  (grey = no report)",
                    self.metric.display_name(),
                    format_metric(self.metric, lo),
                    format_metric(self.metric, hi)
                ),
                None => "No states reported on this date.".to_string(),
            };
            buf.set_stringn(area.x, legend_y, legend, area.width as usize, Style::default().fg(Color::Gray));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_span_the_scale() {
        assert_eq!(shade_bin(0.0, 0.0, 100.0), 0);
        assert_eq!(shade_bin(19.9, 0.0, 100.0), 0);
        assert_eq!(shade_bin(20.0, 0.0, 100.0), 1);
        assert_eq!(shade_bin(99.0, 0.0, 100.0), 4);
        assert_eq!(shade_bin(100.0, 0.0, 100.0), 4);
        assert_eq!(shade_bin(-5.0, -10.0, 10.0), 1);
        assert_eq!(shade_bin(5.0, 5.0, 5.0), 4);
        assert_eq!(shade_bin(0.0, 0.0, 0.0), 0);
        assert_eq!(shade_bin(f64::NAN, 0.0, 1.0), 0);
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn renders_selected_state_and_legend() {
        let ny = UsState::parse("NY").unwrap();
        let ca = UsState::parse("CA").unwrap();
        let values = vec![(ca, 2_270_000.0), (ny, 1_011_665.0)];
        let area = Rect::new(0, 0, 66, 17);
        let mut buf = Buffer::empty(area);
        ChoroplethMap {
            values: &values,
            selected: ny,
            metric: Metric::Confirmed,
        }
        .render(area, &mut buf);

        // tile_w = 6, tile_h = 2; NY sits at row 2, col 8.
        let ny_row = row_text(&buf, 4);
        assert!(ny_row.contains("[NY]"), "{ny_row:?}");

        // CA holds the max, so it gets the darkest shade.
        let (r, g, b) = REDS[4];
        assert_eq!(buf[(0, 8)].bg, Color::Rgb(r, g, b));
        // TX did not report.
        assert_eq!(buf[(18, 14)].bg, NO_DATA);

        let legend = row_text(&buf, 16);
        assert!(legend.starts_with("Confirmed: 1.0M .. 2.3M"), "{legend:?}");
    }
}
