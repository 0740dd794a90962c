//! figsheet-render: Figure rendering for figsheet.
//!
//! Draws group sheets and report figures with plotters, either into RGB
//! buffers (previews, PDF pages, PNG files) or as SVG, and assembles
//! multi-page PDFs with printpdf.
//!

pub mod charts;
mod error;
pub mod export;
pub mod heatmap;
pub mod layout;
pub mod pdf;
pub mod report;
pub mod sheet;

pub use charts::SheetHistogram;
pub use error::{Error, Result};
pub use export::{default_export_dir, export_sheets, ExportOptions, ExportReport, SHEETS_PDF};
pub use heatmap::HeatmapCells;
pub use layout::{heatmap_grid, sanitize_filename, sheet_file_stem, FractionAxis};
pub use pdf::write_pdf;
pub use report::{
    generate_report, regenerate_report, render_report_rgb, ReportFigure, ReportOptions,
    ReportOutput, ReportPanel, COMBINED_PDF,
};
pub use sheet::{
    render_sheet_rgb, render_sheet_svg, RgbSheetRenderer, SheetData, SheetImage, SheetStyle,
    PREVIEW_DPI,
};
