//! Table persistence.
//!
//! Tables are stored as `{"columns": [...], "rows": [{"Filename": ...}]}`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use figsheet_core::{Column, FileRecord, Table};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Supplies a directory for tables saved without one.
pub trait DirectoryResolver {
    /// Returns the directory holding the images of the table at
    /// `table_path`, or `None` to cancel the load.
    fn resolve_directory(&mut self, table_path: &Path) -> Option<PathBuf>;
}

impl<F> DirectoryResolver for F
where
    F: FnMut(&Path) -> Option<PathBuf>,
{
    fn resolve_directory(&mut self, table_path: &Path) -> Option<PathBuf> {
        self(table_path)
    }
}

/// Resolver that always answers with the same (possibly absent) directory.
#[derive(Debug, Clone, Default)]
pub struct FixedDirectory(pub Option<PathBuf>);

impl DirectoryResolver for FixedDirectory {
    fn resolve_directory(&mut self, _table_path: &Path) -> Option<PathBuf> {
        self.0.clone()
    }
}

#[derive(Serialize)]
struct TableDocumentRef<'a> {
    columns: &'a [Column],
    rows: &'a [FileRecord],
}

#[derive(Deserialize)]
struct TableDocument {
    columns: Vec<Column>,
    #[serde(default)]
    rows: Vec<FileRecord>,
}

/// Write a table to `path`.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn save_table<P: AsRef<Path>>(path: P, table: &Table) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    let doc = TableDocumentRef {
        columns: table.columns(),
        rows: table.rows(),
    };
    serde_json::to_writer_pretty(&mut writer, &doc)?;
    writer.flush()?;
    log::info!("saved table with {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Read a table from `path`.
///
/// A table without a Directory column gets one from `resolver`; the
/// corrected table is written back to `path` immediately.
///
/// # Errors
/// - `MissingColumns` (via `CoreError`) if Filename is absent.
/// - `Cancelled` if the resolver returns `None`.
/// - I/O and JSON errors.
pub fn load_table<P, R>(path: P, resolver: &mut R) -> Result<Table>
where
    P: AsRef<Path>,
    R: DirectoryResolver + ?Sized,
{
    let path = path.as_ref();
    let doc: TableDocument = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let mut table = Table::from_parts(doc.columns, doc.rows)?;
    table.require(&[Column::Filename])?;

    if !table.has_column(Column::Directory) {
        let Some(dir) = resolver.resolve_directory(path) else {
            log::info!("load of {} cancelled: no directory given", path.display());
            return Err(Error::Cancelled);
        };
        table.backfill_directory(&dir)?;
        save_table(path, &table)?;
        log::info!(
            "added Directory column ({}) to {}",
            dir.display(),
            path.display()
        );
    }

    log::debug!("loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}
