//! Thresholded heatmaps.
//!
//! Images are reduced to a bounded grid of cells (block means) before
//! drawing. A cell is masked when the majority of its pixels fall below
//! the threshold; with one pixel per cell this is exactly `value < threshold`.

use figsheet_core::Colormap;
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::Result;

/// A block-averaged, masked image ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCells {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    masked: Vec<bool>,
    /// Color scale range, taken over unmasked full-resolution pixels.
    pub vmin: f64,
    pub vmax: f64,
}

impl HeatmapCells {
    /// Reduce `image` to at most `max_cells` cells along its longer axis.
    #[must_use]
    pub fn new(image: &Array2<f64>, threshold: f64, max_cells: usize) -> Self {
        let (h, w) = image.dim();
        let block = h.max(w).div_ceil(max_cells.max(1)).max(1);
        let rows = h.div_ceil(block);
        let cols = w.div_ceil(block);

        let mut values = Vec::with_capacity(rows * cols);
        let mut masked = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let mut sum = 0.0;
                let mut finite = 0usize;
                let mut below = 0usize;
                let mut total = 0usize;
                for y in (r * block)..((r + 1) * block).min(h) {
                    for x in (c * block)..((c + 1) * block).min(w) {
                        let v = image[[y, x]];
                        total += 1;
                        if v.is_finite() {
                            sum += v;
                            finite += 1;
                        }
                        if !(v >= threshold) {
                            below += 1;
                        }
                    }
                }
                #[allow(clippy::cast_precision_loss)]
                values.push(if finite > 0 { sum / finite as f64 } else { f64::NAN });
                masked.push(below * 2 > total);
            }
        }

        let (vmin, vmax) = image
            .iter()
            .filter(|v| v.is_finite() && **v >= threshold)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (vmin, vmax) = if vmin.is_finite() {
            (vmin, vmax)
        } else {
            (threshold, threshold)
        };

        Self {
            rows,
            cols,
            values,
            masked,
            vmin,
            vmax,
        }
    }

    #[must_use]
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    #[must_use]
    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.masked[row * self.cols + col]
    }

    /// Share of masked cells.
    #[must_use]
    pub fn masked_fraction(&self) -> f64 {
        if self.masked.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = self.masked.iter().filter(|m| **m).count() as f64 / self.masked.len() as f64;
        share
    }

    /// Display color of one cell.
    #[must_use]
    pub fn color(&self, row: usize, col: usize, colormap: Colormap, mask: RGBColor) -> RGBColor {
        if self.is_masked(row, col) {
            return mask;
        }
        let span = self.vmax - self.vmin;
        let t = if span > 0.0 {
            (self.value(row, col) - self.vmin) / span
        } else {
            0.0
        };
        let [r, g, b] = colormap.apply(t);
        RGBColor(r, g, b)
    }
}

/// Draw cells into `area`, centered and with square cells.
///
/// # Errors
/// Returns `Drawing` if the backend rejects a primitive.
pub fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    cells: &HeatmapCells,
    colormap: Colormap,
    mask: RGBColor,
) -> Result<()> {
    let (rows, cols) = cells.dim();
    let (w, h) = area.dim_in_pixel();
    if rows == 0 || cols == 0 || w == 0 || h == 0 {
        return Ok(());
    }

    #[allow(clippy::cast_precision_loss)]
    let cell = (f64::from(w) / cols as f64).min(f64::from(h) / rows as f64);
    #[allow(clippy::cast_precision_loss)]
    let (img_w, img_h) = (cell * cols as f64, cell * rows as f64);
    let x0 = (f64::from(w) - img_w) / 2.0;
    let y0 = (f64::from(h) - img_h) / 2.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let px = |origin: f64, i: usize| (origin + cell * i as f64).round() as i32;

    for r in 0..rows {
        let (top, bottom) = (px(y0, r), px(y0, r + 1));
        for c in 0..cols {
            let (left, right) = (px(x0, c), px(x0, c + 1));
            if right <= left || bottom <= top {
                continue;
            }
            let color = cells.color(r, c, colormap, mask);
            area.draw(&Rectangle::new(
                [(left, top), (right - 1, bottom - 1)],
                color.filled(),
            ))?;
        }
    }

    area.draw(&Rectangle::new(
        [(px(x0, 0), px(y0, 0)), (px(x0, cols) - 1, px(y0, rows) - 1)],
        RGBColor(160, 160, 160).stroke_width(1),
    ))?;
    Ok(())
}

/// Draw a framed placeholder with a centered message.
///
/// # Errors
/// Returns `Drawing` if the backend rejects a primitive or the font is
/// unavailable.
pub fn draw_placeholder<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    message: &str,
    color: RGBColor,
    font_px: f64,
) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    if w < 2 || h < 2 {
        return Ok(());
    }
    #[allow(clippy::cast_possible_wrap)]
    let (w, h) = (w as i32, h as i32);
    area.draw(&Rectangle::new(
        [(0, 0), (w - 1, h - 1)],
        RGBColor(200, 200, 200).stroke_width(1),
    ))?;
    let style = ("sans-serif", font_px)
        .into_font()
        .color(&color)
        .pos(Pos::new(HPos::Center, VPos::Center));
    let lines: Vec<&str> = message.lines().collect();
    #[allow(clippy::cast_possible_truncation)]
    let line_h = (font_px * 1.2).round() as i32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let first = h / 2 - line_h * (lines.len() as i32 - 1) / 2;
    for (i, line) in lines.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let y = first + line_h * i as i32;
        area.draw(&Text::new(*line, (w / 2, y), style.clone()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_full_resolution_mask_matches_threshold() {
        let img = array![[1.0, 5.0], [10.0, f64::NAN]];
        let cells = HeatmapCells::new(&img, 5.0, 16);
        assert_eq!(cells.dim(), (2, 2));
        assert!(cells.is_masked(0, 0));
        assert!(!cells.is_masked(0, 1));
        assert!(!cells.is_masked(1, 0));
        assert!(cells.is_masked(1, 1));
        assert_relative_eq!(cells.vmin, 5.0);
        assert_relative_eq!(cells.vmax, 10.0);
    }

    #[test]
    fn test_block_average_reduces_grid() {
        let img = Array2::from_shape_fn((100, 50), |(y, _)| if y < 50 { 0.0 } else { 100.0 });
        let cells = HeatmapCells::new(&img, 50.0, 10);
        assert_eq!(cells.dim(), (10, 5));
        assert!(cells.is_masked(0, 0));
        assert!(!cells.is_masked(9, 4));
        assert_relative_eq!(cells.value(9, 4), 100.0);
        assert_relative_eq!(cells.masked_fraction(), 0.5);
    }

    #[test]
    fn test_colors_use_mask_and_colormap() {
        let img = array![[0.0, 10.0, 20.0]];
        let cells = HeatmapCells::new(&img, 5.0, 8);
        let mask = RGBColor(0, 0, 0);
        assert_eq!(cells.color(0, 0, Colormap::Grayscale, mask), mask);
        assert_eq!(
            cells.color(0, 1, Colormap::Grayscale, mask),
            RGBColor(0, 0, 0)
        );
        assert_eq!(
            cells.color(0, 2, Colormap::Grayscale, mask),
            RGBColor(255, 255, 255)
        );
    }

    #[test]
    fn test_draw_heatmap_into_buffer() {
        let img = Array2::from_shape_fn((4, 4), |(y, x)| (y * 4 + x) as f64);
        let cells = HeatmapCells::new(&img, 8.0, 4);
        let (w, h) = (40u32, 40u32);
        let mut buf = vec![255u8; (w * h * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
            draw_heatmap(&root, &cells, Colormap::Viridis, RGBColor(0, 0, 0)).unwrap();
            root.present().unwrap();
        }
        // Top-left cell is masked (value 0 < 8), bottom-right is the brightest.
        let at = |x: u32, y: u32| {
            let i = ((y * w + x) * 3) as usize;
            [buf[i], buf[i + 1], buf[i + 2]]
        };
        assert_eq!(at(5, 5), [0, 0, 0]);
        assert_eq!(at(35, 35), [253, 231, 37]);
    }
}
