//! ASCII plotting of a single time series for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - series: `*` line
//! - optional selected date: `|` column

use chrono::NaiveDate;

/// Render `series` (oldest first) on a `width` x `height` grid.
pub fn render_ascii_series(
    series: &[(NaiveDate, f64)],
    label: &str,
    marker: Option<NaiveDate>,
    width: usize,
    height: usize,
) -> String {
    let (Some(&(start, _)), Some(&(end, _))) = (series.first(), series.last()) else {
        return format!("Plot: {label} | no data\n");
    };

    let width = width.max(10);
    let height = height.max(5);

    let t_max = (end - start).num_days().max(1) as f64;
    let (y_min, y_max) = y_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let points: Vec<(usize, usize)> = series
        .iter()
        .map(|&(date, y)| {
            let t = (date - start).num_days() as f64;
            (map_x(t, 0.0, t_max, width), map_y(y, y_min, y_max, height))
        })
        .collect();

    let mut prev = None;
    for &(x, y) in &points {
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, '*'),
            None => grid[y][x] = '*',
        }
        prev = Some((x, y));
    }

    if let Some(m) = marker.filter(|m| *m >= start && *m <= end) {
        let x = map_x((m - start).num_days() as f64, 0.0, t_max, width);
        for row in grid.iter_mut() {
            if row[x] == ' ' {
                row[x] = '|';
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {label} | {start} .. {end} | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn y_range(series: &[(NaiveDate, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in series {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
