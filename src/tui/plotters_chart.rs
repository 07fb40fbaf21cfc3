//! Plotters-powered time-series chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use chrono::{Days, NaiveDate};
use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One line on a chart. X values are days since the chart's `x_origin`.
pub struct ChartLine {
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
}

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call so `render()`
/// only draws.
pub struct TimeSeriesChart<'a> {
    pub lines: &'a [ChartLine],
    /// Date at x = 0.
    pub x_origin: NaiveDate,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    /// Selected date, drawn as a vertical line.
    pub marker: Option<f64>,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for TimeSeriesChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area; show a hint instead.
        if area.width < 20 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let origin = self.x_origin;
        let fmt_x = move |v: &f64| -> String {
            origin
                .checked_add_days(Days::new(v.max(0.0).round() as u64))
                .map(|d| d.format("%Y-%m").to_string())
                .unwrap_or_default()
        };

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 7)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(4)
                .y_labels(4)
                .x_label_formatter(&fmt_x)
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            if let Some(m) = self.marker.filter(|m| *m >= x0 && *m <= x1) {
                let marker_color = RGBColor(128, 128, 128);
                chart.draw_series(LineSeries::new([(m, y0), (m, y1)], &marker_color))?;
            }

            for line in self.lines {
                chart.draw_series(LineSeries::new(line.points.iter().copied(), &line.color))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
