//! Report figures: one row per condition, one heatmap per timepoint and a
//! fraction trend per row.

use std::path::{Path, PathBuf};

use figsheet_core::{FigureSelection, ReportLayout, ReportSelection};
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::charts::draw_fraction_trend;
use crate::heatmap::{draw_heatmap, draw_placeholder, HeatmapCells};
use crate::layout::{inches_to_px, pt_to_px, ratio_breakpoints, sanitize_filename};
use crate::pdf::write_pdf;
use crate::sheet::{SheetImage, SheetStyle};
use crate::Result;

/// Combined PDF written next to the per-figure files.
pub const COMBINED_PDF: &str = "combined_figures.pdf";

/// Report figure size in inches.
pub const REPORT_SIZE_IN: (f64, f64) = (16.0, 10.0);

const MISSING_COLOR: RGBColor = RGBColor(128, 128, 128);
const FAILED_COLOR: RGBColor = RGBColor(220, 30, 30);
const TREND_COLOR: RGBColor = RGBColor(0x34, 0x98, 0xDB);

/// Content of one timepoint cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportPanel {
    /// No file was selected for the timepoint.
    Missing,
    /// The selected file could not be loaded.
    Failed,
    Loaded(HeatmapCells),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub panels: Vec<ReportPanel>,
    pub fractions: Vec<Option<f64>>,
}

/// A figure with its images loaded and reduced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFigure {
    pub name: String,
    pub threshold: Option<f64>,
    pub timepoints: Vec<String>,
    pub rows: Vec<ReportRow>,
    /// Shared upper y-limit of every trend in the figure.
    pub y_max: f64,
}

impl ReportFigure {
    /// Load the images of a figure selection.
    #[must_use]
    pub fn load(figure: &FigureSelection, layout: &ReportLayout, style: &SheetStyle) -> Self {
        Self::build(figure, layout, style, |dir, name| {
            figsheet_io::load_image_lenient(dir, name)
        })
    }

    /// Build a figure with a custom image source.
    pub fn build<F>(
        figure: &FigureSelection,
        layout: &ReportLayout,
        style: &SheetStyle,
        mut load: F,
    ) -> Self
    where
        F: FnMut(&Path, &str) -> Option<Array2<f64>>,
    {
        let timepoints: Vec<String> = layout.timepoint_labels().map(str::to_string).collect();
        let rows = layout
            .row_labels
            .iter()
            .map(|label| {
                let selected = figure.row(label);
                let mut panels = Vec::with_capacity(timepoints.len());
                let mut fractions = Vec::with_capacity(timepoints.len());
                for tp in &timepoints {
                    let Some(file) = selected.and_then(|row| row.get(tp)) else {
                        panels.push(ReportPanel::Missing);
                        fractions.push(None);
                        continue;
                    };
                    // Without a threshold nothing is masked.
                    let threshold = file
                        .threshold
                        .or(figure.threshold)
                        .unwrap_or(f64::NEG_INFINITY);
                    panels.push(match load(&file.directory, &file.filename) {
                        Some(image) => ReportPanel::Loaded(HeatmapCells::new(
                            &image,
                            threshold,
                            style.max_cells,
                        )),
                        None => ReportPanel::Failed,
                    });
                    fractions.push(file.fraction.filter(|f| f.is_finite()));
                }
                ReportRow {
                    label: label.clone(),
                    panels,
                    fractions,
                }
            })
            .collect();

        Self {
            name: figure.figure_name.clone(),
            threshold: figure.threshold,
            timepoints,
            rows,
            y_max: figure.fraction_axis_max(),
        }
    }

    /// Two-line title: name and threshold.
    #[must_use]
    pub fn title_lines(&self) -> (String, String) {
        let threshold = self
            .threshold
            .map_or_else(|| "n/a".to_string(), |t| format!("{t:.1}"));
        (self.name.clone(), format!("Threshold: {threshold}"))
    }

    /// Output file stem.
    #[must_use]
    pub fn file_stem(&self) -> String {
        sanitize_filename(&self.name)
    }
}

fn column_ratios(timepoints: usize) -> Vec<f64> {
    let mut ratios = vec![0.8];
    ratios.extend(std::iter::repeat(1.0).take(timepoints));
    ratios.extend([0.3, 1.5]);
    ratios
}

/// Draw a report figure onto `root`.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn draw_report<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &ReportFigure,
    style: &SheetStyle,
    dpi: f64,
) -> Result<()> {
    root.fill(&WHITE)?;
    let (w, h) = root.dim_in_pixel();
    #[allow(clippy::cast_possible_wrap)]
    let (w, h) = (w as i32, h as i32);
    let bold = |pt: f64| {
        ("sans-serif", pt_to_px(pt, dpi))
            .into_font()
            .style(FontStyle::Bold)
    };

    let (name, threshold) = figure.title_lines();
    let centered = Pos::new(HPos::Center, VPos::Center);
    root.draw(&Text::new(name, (w / 2, h * 3 / 100), bold(14.0).color(&BLACK).pos(centered)))?;
    root.draw(&Text::new(
        threshold,
        (w / 2, h * 7 / 100),
        bold(12.0).color(&BLACK).pos(centered),
    ))?;

    let body = root.margin(h * 12 / 100, h * 5 / 100, w * 2 / 100, w * 2 / 100);
    #[allow(clippy::cast_possible_truncation)]
    let header_h = pt_to_px(16.0, dpi) as i32;
    let (header, grid) = body.split_vertically(header_h);
    let (grid_w, grid_h) = grid.dim_in_pixel();
    #[allow(clippy::cast_possible_wrap)]
    let (grid_w, grid_h) = (grid_w as i32, grid_h as i32);

    let k = figure.timepoints.len();
    let x_breaks = ratio_breakpoints(grid_w, &column_ratios(k));
    let n_cols = k + 3;

    let header_cells = header.split_by_breakpoints(&x_breaks, Vec::<i32>::new());
    for (tp, cell) in figure.timepoints.iter().zip(header_cells.iter().skip(1)) {
        #[allow(clippy::cast_possible_wrap)]
        let (cw, ch) = (cell.dim_in_pixel().0 as i32, header_h);
        cell.draw(&Text::new(
            tp.clone(),
            (cw / 2, ch / 2),
            bold(10.0).color(&BLACK).pos(centered),
        ))?;
    }

    let n_rows = figure.rows.len();
    if n_rows == 0 {
        return Ok(());
    }
    let y_breaks = ratio_breakpoints(grid_h, &vec![1.0; n_rows]);
    let cells = grid.split_by_breakpoints(&x_breaks, &y_breaks);
    #[allow(clippy::cast_possible_truncation)]
    let pad = pt_to_px(3.0, dpi) as i32;

    for (r, row) in figure.rows.iter().enumerate() {
        let row_cells = &cells[r * n_cols..(r + 1) * n_cols];

        let label_area = &row_cells[0];
        let (lw, lh) = label_area.dim_in_pixel();
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let anchor = ((f64::from(lw) * 0.9) as i32, lh as i32 / 2);
        label_area.draw(&Text::new(
            row.label.clone(),
            anchor,
            bold(10.0)
                .color(&BLACK)
                .pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;

        for (panel, area) in row.panels.iter().zip(&row_cells[1..=k]) {
            let area = area.margin(pad, pad, pad / 2, pad / 2);
            match panel {
                ReportPanel::Loaded(heat) => draw_heatmap(&area, heat, style.colormap, style.mask)?,
                ReportPanel::Failed => {
                    draw_placeholder(&area, "Load\nFailed", FAILED_COLOR, pt_to_px(7.0, dpi))?;
                }
                ReportPanel::Missing => {
                    draw_placeholder(&area, "No\nFile", MISSING_COLOR, pt_to_px(7.0, dpi))?;
                }
            }
        }

        draw_fraction_trend(
            &row_cells[k + 2],
            &figure.timepoints,
            &row.fractions,
            figure.y_max,
            TREND_COLOR,
            dpi,
        )?;
    }
    Ok(())
}

/// Render a report figure into an RGB buffer.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn render_report_rgb(figure: &ReportFigure, style: &SheetStyle, dpi: f64) -> Result<SheetImage> {
    let (width, height) = inches_to_px(REPORT_SIZE_IN.0, REPORT_SIZE_IN.1, dpi);
    let mut pixels = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw_report(&root, figure, style, dpi)?;
        root.present()?;
    }
    Ok(SheetImage {
        width,
        height,
        pixels,
    })
}

/// Render a report figure as an SVG file.
///
/// # Errors
/// Returns `Drawing` on backend or font failure.
pub fn render_report_svg(
    figure: &ReportFigure,
    style: &SheetStyle,
    dpi: f64,
    path: &Path,
) -> Result<()> {
    let size = inches_to_px(REPORT_SIZE_IN.0, REPORT_SIZE_IN.1, dpi);
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_report(&root, figure, style, dpi)?;
    root.present()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Resolutions and styling of report output.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub png_dpi: f64,
    pub pdf_dpi: f64,
    pub svg_dpi: f64,
    pub style: SheetStyle,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            png_dpi: 300.0,
            pdf_dpi: 150.0,
            svg_dpi: 100.0,
            style: SheetStyle {
                max_cells: 96,
                ..SheetStyle::default()
            },
        }
    }
}

/// Files written by a report run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOutput {
    pub written: Vec<PathBuf>,
    pub failures: Vec<(String, String)>,
}

impl ReportOutput {
    fn fail(&mut self, item: &str, err: impl std::fmt::Display) {
        log::warn!("report output {item} failed: {err}");
        self.failures.push((item.to_string(), err.to_string()));
    }
}

/// Write every figure of `selection` into `out_dir`.
///
/// Produces `combined_figures.pdf` plus one PNG and SVG per figure. The
/// selection itself is written as `figure_selections.json` when
/// `save_selection` is set.
///
/// # Errors
/// Returns an error if `out_dir` cannot be created; per-file failures are
/// collected in the output.
pub fn generate_report(
    selection: &ReportSelection,
    out_dir: &Path,
    save_selection: bool,
    options: &ReportOptions,
) -> Result<ReportOutput> {
    std::fs::create_dir_all(out_dir)?;
    let mut output = ReportOutput::default();
    let mut pages = Vec::with_capacity(selection.figures.len());

    for selected in &selection.figures {
        let figure = ReportFigure::load(selected, &selection.layout, &options.style);
        let stem = figure.file_stem();
        log::debug!("rendering report figure {}", figure.name);

        let png = out_dir.join(format!("{stem}.png"));
        match render_report_rgb(&figure, &options.style, options.png_dpi)
            .and_then(|img| img.save_png(&png))
        {
            Ok(()) => output.written.push(png),
            Err(e) => output.fail(&format!("{stem}.png"), e),
        }

        let svg = out_dir.join(format!("{stem}.svg"));
        match render_report_svg(&figure, &options.style, options.svg_dpi, &svg) {
            Ok(()) => output.written.push(svg),
            Err(e) => output.fail(&format!("{stem}.svg"), e),
        }

        match render_report_rgb(&figure, &options.style, options.pdf_dpi) {
            Ok(page) => pages.push(page),
            Err(e) => output.fail(&format!("{stem} (PDF page)"), e),
        }
    }

    if !pages.is_empty() {
        let pdf = out_dir.join(COMBINED_PDF);
        match write_pdf(&pdf, "figsheet report", &pages, options.pdf_dpi) {
            Ok(()) => output.written.push(pdf),
            Err(e) => output.fail(COMBINED_PDF, e),
        }
    }

    if save_selection {
        let path = out_dir.join(figsheet_io::SELECTION_FILENAME);
        match figsheet_io::save_selection(&path, selection) {
            Ok(()) => output.written.push(path),
            Err(e) => output.fail(figsheet_io::SELECTION_FILENAME, e),
        }
    }
    Ok(output)
}

/// Re-render a saved selection next to its selection file.
///
/// # Errors
/// Returns an error if the selection cannot be loaded or validated, or the
/// output directory cannot be created.
pub fn regenerate_report(selection_path: &Path, options: &ReportOptions) -> Result<ReportOutput> {
    let selection = figsheet_io::load_selection(selection_path)?;
    let out_dir = selection_path.parent().unwrap_or_else(|| Path::new("."));
    log::info!(
        "regenerating {} figures from {}",
        selection.figures.len(),
        selection_path.display()
    );
    generate_report(&selection, out_dir, false, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figsheet_core::SelectedFile;
    use ndarray::array;
    use std::collections::BTreeMap;

    fn selected(filename: &str, fraction: Option<f64>) -> SelectedFile {
        SelectedFile {
            filename: filename.into(),
            directory: PathBuf::from("/data"),
            group: "ctrl".into(),
            group_id: 1,
            fraction,
            threshold: None,
        }
    }

    fn figure() -> FigureSelection {
        let mut row = BTreeMap::new();
        row.insert("0h".to_string(), selected("ctrl_00h.tif", Some(0.2)));
        row.insert("24h".to_string(), selected("broken_24h.tif", Some(0.5)));
        let mut rows = BTreeMap::new();
        rows.insert("Ctrl #1".to_string(), row);
        FigureSelection {
            key: "fig1".into(),
            figure_name: "(STAT3)-Lemon".into(),
            threshold: Some(3.0),
            source_table: PathBuf::from("/data/table.json"),
            rows,
        }
    }

    #[test]
    fn test_build_marks_missing_and_failed() {
        let layout = ReportLayout::default();
        let fig = ReportFigure::build(&figure(), &layout, &SheetStyle::default(), |_, name| {
            (name == "ctrl_00h.tif").then(|| array![[1.0, 5.0]])
        });
        assert_eq!(fig.rows.len(), layout.row_labels.len());
        assert_eq!(fig.timepoints.len(), 6);

        let first = &fig.rows[0];
        assert_eq!(first.label, "Ctrl #1");
        assert!(matches!(first.panels[0], ReportPanel::Loaded(_)));
        assert_eq!(first.panels[1], ReportPanel::Missing);
        assert_eq!(first.panels[4], ReportPanel::Failed);
        assert_eq!(first.fractions[0], Some(0.2));
        assert_eq!(first.fractions[4], Some(0.5));
        assert!(fig.rows[1].panels.iter().all(|p| *p == ReportPanel::Missing));

        assert!((fig.y_max - 0.55).abs() < 1e-12);
        assert_eq!(fig.file_stem(), "STAT3_-Lemon");
        assert_eq!(fig.title_lines().1, "Threshold: 3.0");
    }

    #[test]
    fn test_column_ratios() {
        let ratios = column_ratios(6);
        assert_eq!(ratios.len(), 9);
        assert!((ratios.iter().sum::<f64>() - 8.6).abs() < 1e-12);
    }
}
