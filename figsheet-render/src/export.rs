//! Batch export of group sheets to PNG, SVG and a combined PDF.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use figsheet_core::{Column, DisplayOptions, GroupSheetInput, Table};

use crate::layout::sheet_file_stem;
use crate::pdf::write_pdf;
use crate::sheet::{load_images, render_sheet_rgb, render_sheet_svg, SheetData, SheetStyle};
use crate::Result;

/// File name of the combined sheet PDF.
pub const SHEETS_PDF: &str = "sheets.pdf";

/// Heatmap cell limit used for SVG output, which stores one element per cell.
const SVG_MAX_CELLS: usize = 64;

/// Export settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub out_dir: PathBuf,
    /// PNG resolution.
    pub dpi: f64,
    /// Resolution of the pages embedded in the PDF.
    pub pdf_dpi: f64,
    /// Nominal resolution of SVG output (sets page size and font sizes).
    pub svg_dpi: f64,
    pub write_svg: bool,
    pub display: DisplayOptions,
    pub style: SheetStyle,
}

impl ExportOptions {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            dpi: 300.0,
            pdf_dpi: 150.0,
            svg_dpi: 100.0,
            write_svg: true,
            display: DisplayOptions::default(),
            style: SheetStyle::default(),
        }
    }
}

/// `figures/` next to the table file.
#[must_use]
pub fn default_export_dir(table_path: &Path) -> PathBuf {
    table_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("figures")
}

/// Outcome of an export batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// `(item, error)` for every file that could not be written.
    pub failures: Vec<(String, String)>,
    pub cancelled: bool,
}

impl ExportReport {
    fn fail(&mut self, item: &str, err: impl std::fmt::Display) {
        log::warn!("export of {item} failed: {err}");
        self.failures.push((item.to_string(), err.to_string()));
    }
}

/// Export the sheets of `groups` into `options.out_dir`.
///
/// Per-file failures are collected in the report; the batch continues.
/// `cancel` is checked before each group.
///
/// # Errors
/// Returns `MissingColumns` if the table lacks a column sheets need, or an
/// I/O error if the output directory cannot be created.
pub fn export_sheets(
    table: &Table,
    groups: &[String],
    options: &ExportOptions,
    cancel: &AtomicBool,
) -> Result<ExportReport> {
    table.require(&[Column::Filename, Column::Directory, Column::Threshold])?;
    std::fs::create_dir_all(&options.out_dir)?;

    let mut report = ExportReport::default();
    let mut pages = Vec::new();
    let svg_style = SheetStyle {
        max_cells: options.style.max_cells.min(SVG_MAX_CELLS),
        ..options.style
    };

    for group in groups {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }
        let Some(input) = GroupSheetInput::from_table(table, group) else {
            report.fail(group, "group not in table");
            continue;
        };
        let Some(threshold) = input.threshold else {
            report.fail(group, "no threshold");
            continue;
        };
        let images = load_images(&input);
        let data = SheetData::from_images(&input, threshold, &images, options.display, &options.style);
        let stem = sheet_file_stem(input.group_id, group);

        let png = options.out_dir.join(format!("{stem}.png"));
        match render_sheet_rgb(&data, options.display, &options.style, options.dpi)
            .and_then(|img| img.save_png(&png))
        {
            Ok(()) => report.written.push(png),
            Err(e) => report.fail(&format!("{stem}.png"), e),
        }

        if options.write_svg {
            let svg = options.out_dir.join(format!("{stem}.svg"));
            let svg_data =
                SheetData::from_images(&input, threshold, &images, options.display, &svg_style);
            match render_sheet_svg(&svg_data, options.display, &svg_style, options.svg_dpi, &svg) {
                Ok(()) => report.written.push(svg),
                Err(e) => report.fail(&format!("{stem}.svg"), e),
            }
        }

        match render_sheet_rgb(&data, options.display, &options.style, options.pdf_dpi) {
            Ok(page) => pages.push(page),
            Err(e) => report.fail(&format!("{stem} (PDF page)"), e),
        }
    }

    if !pages.is_empty() {
        let pdf = options.out_dir.join(SHEETS_PDF);
        match write_pdf(&pdf, "figsheet sheets", &pages, options.pdf_dpi) {
            Ok(()) => report.written.push(pdf),
            Err(e) => report.fail(SHEETS_PDF, e),
        }
    }
    log::info!(
        "exported {} files to {} ({} failures)",
        report.written.len(),
        options.out_dir.display(),
        report.failures.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_export_dir() {
        assert_eq!(
            default_export_dir(Path::new("/data/run1/table.json")),
            PathBuf::from("/data/run1/figures")
        );
    }

    #[test]
    fn test_missing_threshold_blocks_export() {
        let table = Table::with_columns(&[Column::Filename, Column::Directory]);
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions::new(dir.path().join("out"));
        let result = export_sheets(&table, &[], &options, &AtomicBool::new(false));
        assert!(result.is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_cancel_before_first_group() {
        let table = Table::with_columns(&[Column::Filename, Column::Directory, Column::Threshold]);
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions::new(dir.path());
        let report = export_sheets(
            &table,
            &["ctrl".to_string()],
            &options,
            &AtomicBool::new(true),
        )
        .unwrap();
        assert!(report.cancelled);
        assert!(report.written.is_empty());
    }
}
