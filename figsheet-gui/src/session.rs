//! State shared between workspaces.

use std::path::{Path, PathBuf};

use figsheet_core::{Grouping, GroupingConfig, Table};

/// Selected input files, the grouping setup and the working table.
///
/// Every table replacement or edit bumps `revision`, so views derived from
/// the table can tell when they are stale.
#[derive(Debug, Default)]
pub struct Session {
    pub files: Vec<PathBuf>,
    pub grouping: GroupingConfig,
    table: Option<Table>,
    table_path: Option<PathBuf>,
    revision: u64,
}

impl Session {
    #[must_use]
    pub fn new(grouping: GroupingConfig) -> Self {
        Self {
            grouping,
            ..Self::default()
        }
    }

    /// Group the current input files with the current rule.
    #[must_use]
    pub fn grouping_of_files(&self) -> Grouping {
        Grouping::build(&self.files, &self.grouping)
    }

    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Mutable access to the table; marks it as changed.
    pub fn table_mut(&mut self) -> Option<&mut Table> {
        if self.table.is_some() {
            self.revision += 1;
        }
        self.table.as_mut()
    }

    #[must_use]
    pub fn table_path(&self) -> Option<&Path> {
        self.table_path.as_deref()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Install a new table, optionally backed by a file.
    pub fn set_table(&mut self, table: Table, path: Option<PathBuf>) {
        log::debug!("session table replaced ({} rows)", table.len());
        self.table = Some(table);
        self.table_path = path;
        self.revision += 1;
    }

    /// Record where the current table was saved.
    pub fn set_table_path(&mut self, path: PathBuf) {
        self.table_path = Some(path);
    }
}
