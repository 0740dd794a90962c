//! Histogram, fraction bar and fraction trend charts.

use figsheet_core::DisplayOptions;
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::heatmap::draw_placeholder;
use crate::layout::{
    bin_edges, dash_segments, file_color, pt_to_px, pt_to_px_u32, FractionAxis, HISTOGRAM_BINS,
    MAX_LEGEND_ENTRIES,
};
use crate::Result;

const THRESHOLD_COLOR: RGBColor = RGBColor(214, 39, 40);
const SEPARATOR_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Above-threshold intensity histograms of one sheet on common bin edges.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetHistogram {
    /// `HISTOGRAM_BINS + 1` edges from the threshold to the global maximum.
    pub edges: Vec<f64>,
    /// Per-file counts (peak-normalized when requested), keyed by the
    /// file's position on the sheet. Files that failed to load are absent.
    pub series: Vec<(usize, Vec<f64>)>,
}

impl SheetHistogram {
    /// Bin the above-threshold pixels of every loaded image.
    ///
    /// Returns `None` when no image has a pixel at or above `threshold`.
    #[must_use]
    pub fn build(images: &[Option<&Array2<f64>>], threshold: f64, normalize: bool) -> Option<Self> {
        let above = |v: &&f64| v.is_finite() && **v >= threshold;
        let max = images
            .iter()
            .flatten()
            .flat_map(|img| img.iter().filter(above))
            .fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        if !max.is_finite() {
            return None;
        }

        let edges = bin_edges(threshold, max, HISTOGRAM_BINS);
        let lo = edges[0];
        let width = edges[1] - edges[0];
        let series = images
            .iter()
            .enumerate()
            .filter_map(|(i, img)| img.map(|img| (i, img)))
            .map(|(i, img)| {
                let mut counts = vec![0.0; HISTOGRAM_BINS];
                for &v in img.iter().filter(above) {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let bin = (((v - lo) / width).floor() as usize).min(HISTOGRAM_BINS - 1);
                    counts[bin] += 1.0;
                }
                if normalize {
                    let peak = counts.iter().copied().fold(0.0, f64::max);
                    if peak > 0.0 {
                        counts.iter_mut().for_each(|c| *c /= peak);
                    }
                }
                (i, counts)
            })
            .collect();
        Some(Self { edges, series })
    }

    /// Plotted y-values per series and the y-range.
    ///
    /// In log mode values are `log10(count)`; empty bins sit on a floor half
    /// a decade below the smallest positive count.
    #[must_use]
    pub fn plot_values(&self, log_scale: bool) -> (Vec<Vec<f64>>, f64, f64) {
        let all = || self.series.iter().flat_map(|(_, c)| c.iter().copied());
        let max = all().fold(0.0, f64::max);
        if !log_scale {
            let hi = if max > 0.0 { max * 1.05 } else { 1.0 };
            let values = self.series.iter().map(|(_, c)| c.clone()).collect();
            return (values, 0.0, hi);
        }

        let min_pos = all().filter(|c| *c > 0.0).fold(f64::INFINITY, f64::min);
        if !min_pos.is_finite() {
            let values = self.series.iter().map(|(_, c)| vec![0.0; c.len()]).collect();
            return (values, 0.0, 1.0);
        }
        let floor = min_pos.log10() - 0.5;
        let values = self
            .series
            .iter()
            .map(|(_, c)| {
                c.iter()
                    .map(|&c| if c > 0.0 { c.log10() } else { floor })
                    .collect()
            })
            .collect();
        (values, floor, max.log10() + 0.2)
    }
}

/// Outline of a step histogram, starting and ending on `base`.
#[must_use]
pub fn step_points(edges: &[f64], values: &[f64], base: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(values.len() * 2 + 2);
    if let Some(&first) = edges.first() {
        points.push((first, base));
    }
    for (i, &v) in values.iter().enumerate() {
        if i + 1 >= edges.len() {
            break;
        }
        points.push((edges[i], v));
        points.push((edges[i + 1], v));
    }
    if let Some(&(x, _)) = points.last() {
        points.push((x, base));
    }
    points
}

fn log_tick(v: f64) -> String {
    let x = 10f64.powf(v);
    if !(0.01..1000.0).contains(&x) {
        format!("{x:.0e}")
    } else if x >= 1.0 {
        format!("{x:.0}")
    } else {
        format!("{x:.2}")
    }
}

/// Draw overlaid step histograms with a dashed threshold line.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn draw_histograms<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    histogram: Option<&SheetHistogram>,
    labels: &[String],
    threshold: f64,
    options: DisplayOptions,
    dpi: f64,
) -> Result<()> {
    let Some(histogram) = histogram else {
        return draw_placeholder(
            area,
            "No pixels above threshold",
            RGBColor(90, 90, 90),
            pt_to_px(8.0, dpi),
        );
    };
    let font = |pt: f64| ("sans-serif", pt_to_px(pt, dpi)).into_font();
    let line = pt_to_px_u32(1.0, dpi);

    let (values, y_lo, y_hi) = histogram.plot_values(options.log_scale);
    let x_lo = histogram.edges[0];
    let x_hi = histogram.edges[histogram.edges.len() - 1];
    let x_pad = (x_hi - x_lo) * 0.02;

    let mut chart = ChartBuilder::on(area)
        .caption("Intensity distribution above threshold", font(8.0))
        .margin(pt_to_px_u32(4.0, dpi))
        .x_label_area_size(pt_to_px_u32(18.0, dpi))
        .y_label_area_size(pt_to_px_u32(28.0, dpi))
        .build_cartesian_2d((x_lo - x_pad)..(x_hi + x_pad), y_lo..y_hi)?;

    let log_scale = options.log_scale;
    let y_fmt = move |v: &f64| {
        if log_scale {
            log_tick(*v)
        } else if *v >= 1000.0 {
            format!("{v:.0e}")
        } else if options.normalize {
            format!("{v:.1}")
        } else {
            format!("{v:.0}")
        }
    };
    let y_desc = match (options.normalize, options.log_scale) {
        (true, true) => "Normalized count (log)",
        (true, false) => "Normalized count",
        (false, true) => "Count (log)",
        (false, false) => "Count",
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Intensity")
        .y_desc(y_desc)
        .label_style(font(6.0))
        .axis_desc_style(font(7.0))
        .x_labels(5)
        .y_labels(5)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&y_fmt)
        .draw()?;

    for ((index, _), ys) in histogram.series.iter().zip(&values) {
        let color = file_color(*index);
        let name = labels.get(*index).cloned().unwrap_or_default();
        chart
            .draw_series(LineSeries::new(
                step_points(&histogram.edges, ys, y_lo),
                color.stroke_width(line),
            ))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
    }

    let span = y_hi - y_lo;
    chart.draw_series(
        dash_segments(y_lo, y_hi, span / 30.0, span / 60.0)
            .into_iter()
            .map(|(a, b)| {
                PathElement::new(
                    vec![(threshold, a), (threshold, b)],
                    THRESHOLD_COLOR.stroke_width(line),
                )
            }),
    )?;

    if !histogram.series.is_empty() && histogram.series.len() <= MAX_LEGEND_ENTRIES {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(font(5.0))
            .draw()?;
    }
    Ok(())
}

fn short_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        name.to_string()
    } else {
        let mut s: String = name.chars().take(max_chars.saturating_sub(1)).collect();
        s.push('…');
        s
    }
}

/// Draw one bar per file with `{:.2}` value labels.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn draw_fraction_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    names: &[String],
    fractions: &[Option<f64>],
    dpi: f64,
) -> Result<()> {
    let n = names.len().min(fractions.len());
    if n == 0 {
        return draw_placeholder(area, "No files", RGBColor(90, 90, 90), pt_to_px(8.0, dpi));
    }
    let font = |pt: f64| ("sans-serif", pt_to_px(pt, dpi)).into_font();
    let axis = FractionAxis::new(&fractions[..n]);

    let mut chart = ChartBuilder::on(area)
        .caption("Fraction above threshold", font(8.0))
        .margin(pt_to_px_u32(4.0, dpi))
        .x_label_area_size(pt_to_px_u32(22.0, dpi))
        .y_label_area_size(pt_to_px_u32(28.0, dpi))
        .build_cartesian_2d((0..n.saturating_sub(1).max(1)).into_segmented(), 0.0..axis.y_max)?;

    let x_fmt = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) => names
            .get(*i)
            .map(|s| short_label(s, 14))
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Fraction")
        .label_style(font(5.5))
        .axis_desc_style(font(7.0))
        .x_labels(n + 1)
        .y_labels(6)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    let gap = pt_to_px_u32(2.0, dpi);
    chart.draw_series(fractions[..n].iter().enumerate().filter_map(|(i, v)| {
        let v = v.filter(|x| x.is_finite())?;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
            file_color(i).filled(),
        );
        bar.set_margin(0, 0, gap, gap);
        Some(bar)
    }))?;

    let label_style = font(5.5)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(axis.labels.iter().filter_map(|(i, text)| {
        let v = fractions[*i]?;
        Some(Text::new(
            text.clone(),
            (SegmentValue::CenterOf(*i), v + axis.y_max * 0.01),
            label_style.clone(),
        ))
    }))?;
    Ok(())
}

/// Draw a fraction scatter over timepoints with a shared y-range.
///
/// Points are joined when more than one value is valid. Dotted separators
/// mark the boundaries after the 4th and 5th timepoints.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn draw_fraction_trend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    timepoints: &[String],
    fractions: &[Option<f64>],
    y_max: f64,
    color: RGBColor,
    dpi: f64,
) -> Result<()> {
    let n = timepoints.len();
    if n == 0 {
        return Ok(());
    }
    let font = |pt: f64| ("sans-serif", pt_to_px(pt, dpi)).into_font();

    let mut chart = ChartBuilder::on(area)
        .margin(pt_to_px_u32(3.0, dpi))
        .x_label_area_size(pt_to_px_u32(14.0, dpi))
        .y_label_area_size(pt_to_px_u32(24.0, dpi))
        .build_cartesian_2d((0..n.saturating_sub(1).max(1)).into_segmented(), 0.0..y_max)?;

    let x_fmt = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) => timepoints.get(*i).cloned().unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(WHITE.mix(0.0))
        .y_desc("Fraction")
        .label_style(font(6.0))
        .axis_desc_style(font(6.5))
        .x_labels(n + 1)
        .y_labels(5)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    let line = pt_to_px_u32(0.8, dpi);
    for boundary in [4, 5].into_iter().filter(|b| *b < n) {
        chart.draw_series(
            dash_segments(0.0, y_max, y_max / 40.0, y_max / 40.0)
                .into_iter()
                .map(|(a, b)| {
                    PathElement::new(
                        vec![
                            (SegmentValue::Exact(boundary), a),
                            (SegmentValue::Exact(boundary), b),
                        ],
                        SEPARATOR_COLOR.stroke_width(line),
                    )
                }),
        )?;
    }

    let points: Vec<(SegmentValue<usize>, f64)> = fractions
        .iter()
        .take(n)
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|v| (SegmentValue::CenterOf(i), v)))
        .collect();
    if points.len() > 1 {
        chart.draw_series(LineSeries::new(
            points.iter().cloned(),
            color.mix(0.7).stroke_width(pt_to_px_u32(1.0, dpi)),
        ))?;
    }
    let radius = pt_to_px_u32(2.5, dpi);
    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new(p.clone(), radius, color.filled())),
    )?;
    chart.draw_series(
        points
            .into_iter()
            .map(|p| Circle::new(p, radius, BLACK.stroke_width(1))),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_histogram_uses_common_edges() {
        let a = array![[0.0, 10.0, 20.0]];
        let b = array![[15.0, 30.0, 1.0]];
        let hist = SheetHistogram::build(&[Some(&a), None, Some(&b)], 10.0, false).unwrap();
        assert_eq!(hist.edges.len(), HISTOGRAM_BINS + 1);
        assert_relative_eq!(hist.edges[0], 10.0);
        assert_relative_eq!(hist.edges[HISTOGRAM_BINS], 30.0);
        assert_eq!(hist.series.len(), 2);
        assert_eq!(hist.series[1].0, 2);
        let total: f64 = hist.series[0].1.iter().sum();
        assert_relative_eq!(total, 2.0);
        // The maximum lands in the last bin.
        assert_relative_eq!(hist.series[1].1[HISTOGRAM_BINS - 1], 1.0);
    }

    #[test]
    fn test_histogram_normalize_and_empty() {
        let a = array![[5.0, 5.0, 6.0]];
        let hist = SheetHistogram::build(&[Some(&a)], 5.0, true).unwrap();
        let peak = hist.series[0].1.iter().copied().fold(0.0, f64::max);
        assert_relative_eq!(peak, 1.0);
        assert!(SheetHistogram::build(&[Some(&a)], 100.0, false).is_none());
        assert!(SheetHistogram::build(&[None], 0.0, false).is_none());
    }

    #[test]
    fn test_log_values_have_floor() {
        let hist = SheetHistogram {
            edges: vec![0.0, 1.0, 2.0, 3.0],
            series: vec![(0, vec![0.0, 10.0, 100.0])],
        };
        let (values, lo, hi) = hist.plot_values(true);
        assert_relative_eq!(lo, 0.5);
        assert_relative_eq!(hi, 2.2);
        assert_relative_eq!(values[0][0], 0.5);
        assert_relative_eq!(values[0][2], 2.0);

        let (linear, lo, hi) = hist.plot_values(false);
        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 105.0);
        assert_relative_eq!(linear[0][1], 10.0);
    }

    #[test]
    fn test_step_points_close_on_base() {
        let pts = step_points(&[0.0, 1.0, 2.0], &[3.0, 4.0], 0.0);
        assert_eq!(
            pts,
            vec![
                (0.0, 0.0),
                (0.0, 3.0),
                (1.0, 3.0),
                (1.0, 4.0),
                (2.0, 4.0),
                (2.0, 0.0)
            ]
        );
    }

    #[test]
    fn test_log_tick_and_short_label() {
        assert_eq!(log_tick(2.0), "100");
        assert_eq!(log_tick(4.0), "1e4");
        assert_eq!(log_tick(-1.0), "0.10");
        assert_eq!(short_label("abcdef", 4), "abc…");
        assert_eq!(short_label("abc", 4), "abc");
    }
}
