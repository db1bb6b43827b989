//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid, one histogram bin per
//! column), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - sample histogram (density-normalised): `#`
//! - fitted density: `*` line
//! - design height (parametric threshold): `|`
//! - empirical percentile height: `:`

use crate::domain::FittedModel;
use crate::fit::density;
use crate::io::ReportFile;

/// Vertical marker drawn across the whole plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub symbol: char,
}

/// Render the sample histogram with the fitted density and optional height markers.
pub fn render_overlay_plot(
    sample: &[f64],
    model: Option<&FittedModel>,
    markers: &[Marker],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max)) = x_range(sample, markers) else {
        return "Plot: (no data)\n".to_string();
    };
    let (x_min, x_max) = pad_range(x_min, x_max, 0.05);
    let bin_width = (x_max - x_min) / width as f64;

    let bars = histogram(sample, x_min, bin_width, width);
    let curve: Vec<f64> = match model {
        Some(m) => (0..width)
            .map(|i| density(m, x_min + (i as f64 + 0.5) * bin_width))
            .collect(),
        None => Vec::new(),
    };

    let top = bars
        .iter()
        .chain(curve.iter())
        .copied()
        .fold(0.0, f64::max);
    let y_max = if top > 0.0 { top * 1.05 } else { 1.0 };

    let mut grid = vec![vec![' '; width]; height];

    // Curve first; bars only fill the cells it left empty.
    draw_curve(&mut grid, &curve, y_max);
    for (col, &d) in bars.iter().enumerate() {
        if d <= 0.0 {
            continue;
        }
        let rows = ((d / y_max) * height as f64).round().max(1.0) as usize;
        for row in grid.iter_mut().rev().take(rows.min(height)) {
            if row[col] == ' ' {
                row[col] = '#';
            }
        }
    }
    for marker in markers {
        let col = column_of(marker.x, x_min, bin_width, width);
        for row in grid.iter_mut() {
            row[col] = marker.symbol;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: height=[{x_min:.2}, {x_max:.2}] | density=[0, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// Render the overlay stored in a saved report (best model + its threshold).
pub fn render_report_plot(report: &ReportFile, width: usize, height: usize) -> String {
    let mut markers = vec![Marker {
        x: report.empirical_height,
        symbol: ':',
    }];
    if let Some(t) = report.best_threshold() {
        markers.push(Marker {
            x: t.height,
            symbol: '|',
        });
    }
    render_overlay_plot(report.sample.values(), Some(&report.best), &markers, width, height)
}

/// Density-normalised counts, one bin per column.
fn histogram(sample: &[f64], x_min: f64, bin_width: f64, bins: usize) -> Vec<f64> {
    let mut counts = vec![0usize; bins];
    for &x in sample {
        counts[column_of(x, x_min, bin_width, bins)] += 1;
    }
    let norm = sample.len() as f64 * bin_width;
    counts.into_iter().map(|c| c as f64 / norm).collect()
}

fn column_of(x: f64, x_min: f64, bin_width: f64, bins: usize) -> usize {
    let u = ((x - x_min) / bin_width).floor();
    if u <= 0.0 {
        0
    } else {
        (u as usize).min(bins - 1)
    }
}

fn x_range(sample: &[f64], markers: &[Marker]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for x in sample.iter().copied().chain(markers.iter().map(|m| m.x)) {
        if x.is_finite() {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
        }
    }
    if !(min_x.is_finite() && max_x.is_finite()) {
        return None;
    }
    if max_x > min_x {
        Some((min_x, max_x))
    } else {
        Some((min_x - 0.5, max_x + 0.5))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_y(y: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = (y / y_max).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[f64], y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let mut prev = None;
    for (x, &d) in curve.iter().enumerate() {
        let y = map_y(d, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, y, '*');
        } else {
            grid[y][x] = '*';
        }
        prev = Some((x, y));
    }
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
