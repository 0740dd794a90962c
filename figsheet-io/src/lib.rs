//! figsheet-io: File I/O for figsheet.
//!
//! Decodes microscopy images into 2-D `f64` planes and persists tables,
//! report selections and configuration as JSON documents.
//!

pub mod config;
mod error;
pub mod loader;
pub mod selection_store;
pub mod table_store;

pub use config::FigsheetConfig;
pub use error::{Error, Result};
pub use loader::{collapse_planes, load_image, load_image_lenient, load_record};
pub use selection_store::{load_selection, save_selection, SELECTION_FILENAME};
pub use table_store::{load_table, save_table, DirectoryResolver, FixedDirectory};
