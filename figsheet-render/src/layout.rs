//! Pure layout math shared by sheets, reports and exports.

use plotters::style::RGBColor;

/// A4 landscape width in millimetres.
pub const A4_WIDTH_MM: f64 = 297.0;
/// A4 landscape height in millimetres.
pub const A4_HEIGHT_MM: f64 = 210.0;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Number of bins of the per-sheet intensity histogram.
pub const HISTOGRAM_BINS: usize = 100;

/// Files beyond this count get no histogram legend.
pub const MAX_LEGEND_ENTRIES: usize = 8;

/// Per-file line/bar colors (the `tab10` qualitative palette).
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Color of the i-th file of a sheet.
#[must_use]
pub fn file_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Pixel size of an A4 landscape page at `dpi`.
#[must_use]
pub fn a4_landscape_px(dpi: f64) -> (u32, u32) {
    (mm_to_px(A4_WIDTH_MM, dpi), mm_to_px(A4_HEIGHT_MM, dpi))
}

/// Font size or stroke width in pixels for a size given in points.
#[must_use]
pub fn pt_to_px(points: f64, dpi: f64) -> f64 {
    points * dpi / 72.0
}

/// Like [`pt_to_px`], rounded to a whole pixel and at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn pt_to_px_u32(points: f64, dpi: f64) -> u32 {
    pt_to_px(points, dpi).round().max(1.0) as u32
}

/// Pixel size of a `width_in` x `height_in` inch figure at `dpi`.
#[must_use]
pub fn inches_to_px(width_in: f64, height_in: f64, dpi: f64) -> (u32, u32) {
    (
        mm_to_px(width_in * MM_PER_INCH, dpi),
        mm_to_px(height_in * MM_PER_INCH, dpi),
    )
}

/// Interior breakpoints splitting `total` pixels proportionally to `ratios`.
#[must_use]
pub fn ratio_breakpoints(total: i32, ratios: &[f64]) -> Vec<i32> {
    let sum: f64 = ratios.iter().sum();
    if ratios.len() < 2 || sum <= 0.0 {
        return Vec::new();
    }
    let mut acc = 0.0;
    ratios[..ratios.len() - 1]
        .iter()
        .map(|r| {
            acc += r;
            #[allow(clippy::cast_possible_truncation)]
            let x = (f64::from(total) * acc / sum).round() as i32;
            x
        })
        .collect()
}

/// Alternating on/off pieces of `from..to` for dashed and dotted lines.
#[must_use]
pub fn dash_segments(from: f64, to: f64, dash: f64, gap: f64) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    if dash <= 0.0 || !(to > from) {
        return out;
    }
    let mut start = from;
    while start < to {
        out.push((start, (start + dash).min(to)));
        start += dash + gap.max(0.0);
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mm_to_px(mm: f64, dpi: f64) -> u32 {
    (mm / MM_PER_INCH * dpi).round().max(1.0) as u32
}

/// Heatmap grid for `n` panels: `cols = ceil(sqrt(1.2 n))`, `rows = ceil(n / cols)`.
#[must_use]
pub fn heatmap_grid(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let cols = ((n as f64 * 1.2).sqrt().ceil() as usize).max(1);
    (n.div_ceil(cols), cols)
}

/// Y-range and value labels of a fraction bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct FractionAxis {
    /// Upper y-limit; the lower limit is always 0.
    pub y_max: f64,
    /// Index and `{:.2}` text of every bar with a valid value.
    pub labels: Vec<(usize, String)>,
}

impl FractionAxis {
    /// `y_max = 1.15 * max` of finite values, or 1.0 when there are none.
    #[must_use]
    pub fn new(values: &[Option<f64>]) -> Self {
        let labels: Vec<(usize, String)> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, format!("{x:.2}"))))
            .collect();
        let max = values
            .iter()
            .filter_map(|v| v.filter(|x| x.is_finite()))
            .fold(f64::NEG_INFINITY, f64::max);
        let y_max = if max.is_finite() && max > 0.0 {
            max * 1.15
        } else {
            1.0
        };
        Self { y_max, labels }
    }
}

/// `bins + 1` equally spaced edges from `lo` to `hi`.
///
/// A degenerate range is widened to `lo..lo + 1`.
#[must_use]
pub fn bin_edges(lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let hi = if hi > lo { hi } else { lo + 1.0 };
    #[allow(clippy::cast_precision_loss)]
    let width = (hi - lo) / bins as f64;
    #[allow(clippy::cast_precision_loss)]
    (0..=bins).map(|i| lo + width * i as f64).collect()
}

/// Make a string safe for use as a file name.
///
/// Characters other than ASCII alphanumerics, `-` and `_` become `_`, runs
/// of `_` collapse, and leading/trailing `_` are trimmed.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        let c = if ch.is_ascii_alphanumeric() || ch == '-' {
            ch
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Export file stem of a sheet: `{id:02}_{sanitized group}`.
#[must_use]
pub fn sheet_file_stem(group_id: u32, group: &str) -> String {
    format!("{group_id:02}_{}", sanitize_filename(group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_heatmap_grid() {
        assert_eq!(heatmap_grid(0), (0, 0));
        assert_eq!(heatmap_grid(1), (1, 2));
        assert_eq!(heatmap_grid(4), (2, 3));
        assert_eq!(heatmap_grid(6), (2, 3));
        assert_eq!(heatmap_grid(10), (3, 4));
    }

    #[test]
    fn test_fraction_axis_with_nan() {
        let axis = FractionAxis::new(&[Some(0.2), Some(0.5), Some(0.9), Some(f64::NAN)]);
        assert_relative_eq!(axis.y_max, 0.9 * 1.15);
        assert_eq!(axis.labels.len(), 3);
        assert_eq!(axis.labels[2], (2, "0.90".to_string()));
    }

    #[test]
    fn test_fraction_axis_without_values() {
        let axis = FractionAxis::new(&[None, Some(f64::NAN)]);
        assert_relative_eq!(axis.y_max, 1.0);
        assert!(axis.labels.is_empty());
        assert_relative_eq!(FractionAxis::new(&[Some(0.0)]).y_max, 1.0);
    }

    #[test]
    fn test_a4_at_300_dpi() {
        assert_eq!(a4_landscape_px(300.0), (3508, 2480));
    }

    #[test]
    fn test_bin_edges() {
        let edges = bin_edges(10.0, 20.0, 100);
        assert_eq!(edges.len(), 101);
        assert_relative_eq!(edges[0], 10.0);
        assert_relative_eq!(edges[100], 20.0);
        let flat = bin_edges(5.0, 5.0, 4);
        assert_relative_eq!(flat[4], 6.0);
    }

    #[test]
    fn test_ratio_breakpoints() {
        assert_eq!(ratio_breakpoints(400, &[1.0, 2.0, 1.0]), vec![100, 300]);
        assert!(ratio_breakpoints(400, &[1.0]).is_empty());
        assert_eq!(inches_to_px(16.0, 10.0, 150.0), (2400, 1500));
    }

    #[test]
    fn test_dash_segments() {
        let dashes = dash_segments(0.0, 1.0, 0.3, 0.2);
        assert_eq!(dashes.len(), 2);
        assert_relative_eq!(dashes[1].0, 0.5);
        assert_relative_eq!(dashes[1].1, 0.8);
        assert!(dash_segments(1.0, 0.0, 0.1, 0.1).is_empty());
        assert_relative_eq!(pt_to_px(72.0, 300.0), 300.0);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("(STAT3)-Lemon"), "STAT3_-Lemon");
        assert_eq!(sanitize_filename("Ctrl A / 24h"), "Ctrl_A_24h");
        assert_eq!(sanitize_filename("***"), "unnamed");
        assert_eq!(sheet_file_stem(3, "NF-kB (p65)"), "03_NF-kB_p65");
    }
}
