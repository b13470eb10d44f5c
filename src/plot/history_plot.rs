use std::path::Path;

use image::Rgb;
use tracing::debug;

use crate::error::Result;
use crate::plot::canvas::Canvas;
use crate::plot::font::{text_width, GLYPH_HEIGHT};
use crate::train::history::History;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 400;
const PANEL_WIDTH: i64 = WIDTH as i64 / 2;

const MARGIN_LEFT: i64 = 80;
const MARGIN_RIGHT: i64 = 24;
const MARGIN_TOP: i64 = 50;
const MARGIN_BOTTOM: i64 = 64;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([224, 224, 224]);
pub const TRAIN_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
pub const VAL_COLOR: Rgb<u8> = Rgb([255, 127, 14]);

const Y_TICKS: usize = 5;
const MAX_X_TICKS: usize = 10;

struct Series<'a> {
    label: &'static str,
    values: &'a [f64],
    color: Rgb<u8>,
}

enum LegendCorner {
    LowerRight,
    UpperRight,
}

/// Renders the two-panel accuracy / loss figure.
pub fn render_history(history: &History) -> Canvas {
    let mut canvas = Canvas::new(WIDTH, HEIGHT, BACKGROUND);
    draw_panel(
        &mut canvas,
        0,
        "MODEL ACCURACY",
        "ACCURACY",
        &[
            Series { label: "TRAINING ACCURACY", values: &history.accuracy, color: TRAIN_COLOR },
            Series { label: "VALIDATION ACCURACY", values: &history.val_accuracy, color: VAL_COLOR },
        ],
        LegendCorner::LowerRight,
    );
    draw_panel(
        &mut canvas,
        PANEL_WIDTH,
        "MODEL LOSS",
        "LOSS",
        &[
            Series { label: "TRAINING LOSS", values: &history.loss, color: TRAIN_COLOR },
            Series { label: "VALIDATION LOSS", values: &history.val_loss, color: VAL_COLOR },
        ],
        LegendCorner::UpperRight,
    );
    canvas
}

/// Writes the training-history figure as a 1200×400 PNG.
pub fn save_history_png(history: &History, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    render_history(history).save_png(path)?;
    debug!(path = %path.display(), epochs = history.len(), "history plot written");
    Ok(())
}

fn draw_panel(
    canvas: &mut Canvas,
    offset_x: i64,
    title: &str,
    y_label: &str,
    series: &[Series<'_>],
    corner: LegendCorner,
) {
    let left = offset_x + MARGIN_LEFT;
    let right = offset_x + PANEL_WIDTH - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = HEIGHT as i64 - MARGIN_BOTTOM;
    let series: Vec<&Series<'_>> = series.iter().filter(|s| !s.values.is_empty()).collect();

    let epochs = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let (x_lo, x_hi) = x_range(epochs);
    let (y_lo, y_hi) = y_range(series.iter().flat_map(|s| s.values.iter().copied()));
    let to_px = |epoch: f64, value: f64| {
        let px = left as f64 + (epoch - x_lo) / (x_hi - x_lo) * (right - left) as f64;
        let py = bottom as f64 - (value - y_lo) / (y_hi - y_lo) * (bottom - top) as f64;
        (px, py)
    };

    // Grid and tick labels.
    let step = ((epochs + MAX_X_TICKS - 1) / MAX_X_TICKS).max(1);
    for e in (0..epochs.max(1)).step_by(step) {
        let (px, _) = to_px(e as f64, y_lo);
        let px = px.round() as i64;
        canvas.fill_rect(px, top, 1, bottom - top, GRID);
        canvas.fill_rect(px, bottom, 1, 5, INK);
        let label = e.to_string();
        canvas.text(px - text_width(&label, 1) as i64 / 2, bottom + 9, &label, 1, INK);
    }
    let decimals = tick_decimals(y_hi - y_lo);
    for i in 0..Y_TICKS {
        let value = y_lo + (y_hi - y_lo) * i as f64 / (Y_TICKS - 1) as f64;
        let (_, py) = to_px(x_lo, value);
        let py = py.round() as i64;
        canvas.fill_rect(left, py, right - left, 1, GRID);
        canvas.fill_rect(left - 5, py, 5, 1, INK);
        let label = format!("{:.*}", decimals, value);
        let w = text_width(&label, 1) as i64;
        canvas.text(left - 9 - w, py - GLYPH_HEIGHT as i64 / 2, &label, 1, INK);
    }
    canvas.stroke_rect(left, top, right - left + 1, bottom - top + 1, INK);

    // Title and axis labels.
    let center_x = (left + right) / 2;
    canvas.text(center_x - text_width(title, 2) as i64 / 2, 18, title, 2, INK);
    canvas.text(center_x - text_width("EPOCH", 2) as i64 / 2, bottom + 28, "EPOCH", 2, INK);
    let label_h = text_width(y_label, 2) as i64;
    canvas.text_vertical(offset_x + 14, (top + bottom) / 2 + label_h / 2, y_label, 2, INK);

    // Curves; a lone epoch is drawn as a point.
    for s in &series {
        if s.values.len() == 1 {
            canvas.point(to_px(0.0, s.values[0]), 4, s.color);
            continue;
        }
        for (i, pair) in s.values.windows(2).enumerate() {
            let a = to_px(i as f64, pair[0]);
            let b = to_px((i + 1) as f64, pair[1]);
            canvas.line(a, b, 2, s.color);
        }
    }

    draw_legend(canvas, &series, left, right, top, bottom, corner);
}

fn draw_legend(
    canvas: &mut Canvas,
    series: &[&Series<'_>],
    left: i64,
    right: i64,
    top: i64,
    bottom: i64,
    corner: LegendCorner,
) {
    if series.is_empty() {
        return;
    }
    const SWATCH: i64 = 20;
    const ROW: i64 = 16;
    let text_w = series.iter().map(|s| text_width(s.label, 1) as i64).max().unwrap_or(0);
    let w = 8 + SWATCH + 6 + text_w + 8;
    let h = 6 + ROW * series.len() as i64;
    let x = (right - w - 8).max(left + 1);
    let y = match corner {
        LegendCorner::UpperRight => top + 8,
        LegendCorner::LowerRight => bottom - h - 8,
    };
    canvas.fill_rect(x, y, w, h, BACKGROUND);
    canvas.stroke_rect(x, y, w, h, GRID);
    for (i, s) in series.iter().enumerate() {
        let row_y = y + 6 + ROW * i as i64;
        let mid = row_y + GLYPH_HEIGHT as i64 / 2;
        canvas.fill_rect(x + 8, mid - 1, SWATCH, 2, s.color);
        canvas.text(x + 8 + SWATCH + 6, row_y, s.label, 1, INK);
    }
}

/// X extent for `n` epochs indexed from 0, with a 5% margin on each side.
fn x_range(n: usize) -> (f64, f64) {
    if n <= 1 {
        return (-0.5, 0.5);
    }
    let span = (n - 1) as f64;
    (-0.05 * span, span * 1.05)
}

/// Y extent covering every finite value, with a 5% margin on each side.
fn y_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { (hi.abs() * 0.1).max(0.05) };
    (lo - pad, hi + pad)
}

fn tick_decimals(span: f64) -> usize {
    match span {
        s if s >= 10.0 => 0,
        s if s >= 1.0 => 1,
        s if s >= 0.1 => 2,
        s if s >= 0.01 => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(canvas: &Canvas, color: Rgb<u8>) -> usize {
        let mut n = 0;
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if canvas.pixel(x, y) == color {
                    n += 1;
                }
            }
        }
        n
    }

    fn history(epochs: usize, with_val: bool) -> History {
        let mut h = History::default();
        for e in 0..epochs {
            h.loss.push(1.0 / (e + 1) as f64);
            h.accuracy.push(0.5 + 0.04 * e as f64);
            if with_val {
                h.val_loss.push(1.2 / (e + 1) as f64);
                h.val_accuracy.push(0.45 + 0.04 * e as f64);
            }
        }
        h
    }

    #[test]
    fn figure_has_fixed_size() {
        let canvas = render_history(&history(10, true));
        assert_eq!((canvas.width(), canvas.height()), (WIDTH, HEIGHT));
        assert!(count(&canvas, TRAIN_COLOR) > 100);
        assert!(count(&canvas, VAL_COLOR) > 100);
    }

    #[test]
    fn single_epoch_draws_points() {
        let canvas = render_history(&history(1, true));
        assert!(count(&canvas, TRAIN_COLOR) > 20);
        assert!(count(&canvas, VAL_COLOR) > 20);
    }

    #[test]
    fn missing_validation_has_no_val_series() {
        let canvas = render_history(&history(3, false));
        assert_eq!(count(&canvas, VAL_COLOR), 0);
        assert!(count(&canvas, TRAIN_COLOR) > 0);
    }

    #[test]
    fn empty_history_still_renders_axes() {
        let canvas = render_history(&History::default());
        assert!(count(&canvas, INK) > 0);
    }

    #[test]
    fn ranges_pad_flat_series() {
        let (lo, hi) = y_range([0.5, 0.5].into_iter());
        assert!(lo < 0.5 && hi > 0.5);
        assert_eq!(y_range([f64::NAN].into_iter()), (0.0, 1.0));
        assert_eq!(x_range(1), (-0.5, 0.5));
    }

    #[test]
    fn writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_history.png");
        save_history_png(&history(2, true), &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (WIDTH, HEIGHT));
    }
}
