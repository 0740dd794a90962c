//! figsheet-core: Core types for microscopy figure sheets.
//!
//! This crate holds everything that does not touch pixels on disk or a
//! drawing backend: file records and the tabular store, the filename
//! grouper, threshold/fraction math, and the keyed sheet cache that backs
//! the incremental preview.
//!

pub mod cache;
pub mod debounce;
pub mod display;
pub mod error;
pub mod grouping;
pub mod importer;
pub mod preview;
pub mod processor;
pub mod record;
pub mod report;
pub mod table;

pub use cache::{CachedSheet, SheetCache};
pub use debounce::Debouncer;
pub use display::{Colormap, DisplayOptions};
pub use error::{Error, Result};
pub use grouping::{GroupPreview, GroupRule, Grouping, GroupingConfig, ALL_KEY, UNGROUPED_KEY};
pub use importer::{is_supported_image, FileImporter, SUPPORTED_EXTENSIONS};
pub use preview::{GroupSheetInput, PollOutcome, PreviewManager, SheetRenderer};
pub use processor::{fraction_above, process_table, PixelStats, ProcessReport};
pub use record::{Column, FileRecord};
pub use report::{
    auto_select, AutoSelection, FigureSelection, ReportLayout, ReportSelection, RowSelection,
    SelectedFile, Timepoint,
};
pub use table::{GroupSummary, Table};
