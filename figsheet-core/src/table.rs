//! The tabular store: an ordered list of file records plus their columns.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grouping::{Grouping, UNGROUPED_KEY};
use crate::record::{Column, FileRecord};

/// A group present in a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub name: String,
    pub id: u32,
    pub count: usize,
}

impl GroupSummary {
    /// Label used by group pickers, e.g. `"Ctrl_A (3)"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

/// Ordered collection of file records.
///
/// `columns` lists the present columns in canonical order, except that a
/// backfilled `Directory` is always placed right after `Filename`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<FileRecord>,
}

impl Table {
    /// Create an empty table with the given columns.
    #[must_use]
    pub fn with_columns(columns: &[Column]) -> Self {
        let mut cols: Vec<Column> = Vec::with_capacity(columns.len());
        for c in columns {
            if !cols.contains(c) {
                cols.push(*c);
            }
        }
        Self {
            columns: cols,
            rows: Vec::new(),
        }
    }

    /// Build a table from persisted parts, checking uniqueness.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if two rows share filename and directory.
    pub fn from_parts(columns: Vec<Column>, rows: Vec<FileRecord>) -> Result<Self> {
        let mut table = Self::with_columns(&columns);
        for row in rows {
            table.push(row)?;
        }
        Ok(table)
    }

    /// Build the initial four-column table from a grouping.
    ///
    /// Groups are visited in sorted order. The fallback bucket and the
    /// implicit `all` group of a disabled grouping get an empty group name
    /// and ID 0; every other group gets consecutive IDs from 1.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if the same path appears twice.
    pub fn from_grouping(grouping: &Grouping) -> Result<Self> {
        let mut table = Self::with_columns(&Column::BASE);
        let mut next_id = 1;

        for (key, files) in grouping.groups() {
            let (name, id) = if !grouping.is_enabled() || key == UNGROUPED_KEY {
                (String::new(), 0)
            } else {
                let id = next_id;
                next_id += 1;
                (key.clone(), id)
            };
            for path in files {
                match FileRecord::from_path(path, &name, id) {
                    Some(record) => table.push(record)?,
                    None => log::warn!("skipping path without file name: {}", path.display()),
                }
            }
        }

        log::debug!(
            "built table with {} rows in {} groups",
            table.len(),
            next_id - 1
        );
        Ok(table)
    }

    /// Append a record.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if a record with the same filename and
    /// directory is already present.
    pub fn push(&mut self, record: FileRecord) -> Result<()> {
        if self
            .rows
            .iter()
            .any(|r| r.filename == record.filename && r.directory == record.directory)
        {
            return Err(Error::DuplicateRecord {
                filename: record.filename,
                directory: record.directory.unwrap_or_default(),
            });
        }
        self.rows.push(record);
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[FileRecord] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Fail with every missing column if any of `required` is absent.
    ///
    /// # Errors
    /// Returns `MissingColumns` listing the absent columns.
    pub fn require(&self, required: &[Column]) -> Result<()> {
        let missing: Vec<Column> = required
            .iter()
            .copied()
            .filter(|c| !self.has_column(*c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingColumns(missing))
        }
    }

    /// Distinct non-empty groups ordered by ID, then name.
    #[must_use]
    pub fn groups(&self) -> Vec<GroupSummary> {
        let mut map: BTreeMap<(u32, String), usize> = BTreeMap::new();
        for row in &self.rows {
            let name = row.group_name();
            if name.is_empty() {
                continue;
            }
            *map.entry((row.group_id.unwrap_or(0), name.to_string()))
                .or_default() += 1;
        }
        map.into_iter()
            .map(|((id, name), count)| GroupSummary { name, id, count })
            .collect()
    }

    /// Group ID of a named group.
    #[must_use]
    pub fn group_id(&self, name: &str) -> Option<u32> {
        self.rows
            .iter()
            .find(|r| r.group_name() == name)
            .map(|r| r.group_id.unwrap_or(0))
    }

    /// Rows of one group, in table order.
    #[must_use]
    pub fn group_rows(&self, name: &str) -> Vec<&FileRecord> {
        self.rows.iter().filter(|r| r.group_name() == name).collect()
    }

    /// Sort rows by (Group_ID, Group, Filename).
    pub fn sort_by_groups(&mut self) {
        self.rows.sort_by(|a, b| {
            a.group_id
                .unwrap_or(0)
                .cmp(&b.group_id.unwrap_or(0))
                .then_with(|| a.group_name().cmp(b.group_name()))
                .then_with(|| a.filename.cmp(&b.filename))
        });
    }

    /// Sort rows by filename.
    pub fn sort_by_filename(&mut self) {
        self.rows.sort_by(|a, b| a.filename.cmp(&b.filename));
    }

    /// Insert the Directory column after Filename and set it for every row.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if the uniform directory makes two rows
    /// collide.
    pub fn backfill_directory(&mut self, dir: &Path) -> Result<()> {
        let mut seen = HashSet::new();
        for row in &self.rows {
            if !seen.insert(row.filename.as_str()) {
                return Err(Error::DuplicateRecord {
                    filename: row.filename.clone(),
                    directory: dir.to_path_buf(),
                });
            }
        }
        for row in &mut self.rows {
            row.directory = Some(dir.to_path_buf());
        }
        if !self.has_column(Column::Directory) {
            let at = self
                .columns
                .iter()
                .position(|c| *c == Column::Filename)
                .map_or(0, |i| i + 1);
            self.columns.insert(at, Column::Directory);
        }
        Ok(())
    }

    /// Set the constant threshold on every row, adding the column if needed.
    pub fn set_threshold(&mut self, value: f64) {
        self.ensure_column(Column::Threshold);
        for row in &mut self.rows {
            row.threshold = Some(value);
        }
    }

    /// Set (or clear) the fraction of one row, adding the column if needed.
    ///
    /// # Errors
    /// Returns `RowOutOfRange` for an invalid index.
    pub fn set_fraction(&mut self, index: usize, value: Option<f64>) -> Result<()> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(Error::RowOutOfRange { index, len })?;
        row.fraction = value.filter(|v| v.is_finite());
        self.ensure_column(Column::Fraction);
        Ok(())
    }

    /// The table's threshold, taken from the first row.
    #[must_use]
    pub fn threshold(&self) -> Option<f64> {
        self.rows.first().and_then(|r| r.threshold)
    }

    /// Directory of the first row, used as the default export location.
    #[must_use]
    pub fn first_directory(&self) -> Option<PathBuf> {
        self.rows.first().and_then(|r| r.directory.clone())
    }

    fn ensure_column(&mut self, column: Column) {
        if self.has_column(column) {
            return;
        }
        let at = self
            .columns
            .iter()
            .position(|c| *c > column)
            .unwrap_or(self.columns.len());
        self.columns.insert(at, column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{GroupRule, GroupingConfig};

    fn grouped(names: &[&str]) -> Table {
        let files: Vec<PathBuf> = names
            .iter()
            .map(|n| PathBuf::from("/data").join(n))
            .collect();
        let config = GroupingConfig::with_rule(GroupRule::Underscore { start: 0, end: 1 });
        Table::from_grouping(&Grouping::build(&files, &config)).unwrap()
    }

    #[test]
    fn test_from_grouping_assigns_sorted_ids() {
        let table = grouped(&["lif_1.tif", "ctrl_1.tif", "ctrl_2.tif", "odd.tif"]);
        assert_eq!(table.columns(), &Column::BASE);
        let groups = table.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!((groups[0].name.as_str(), groups[0].id), ("ctrl", 1));
        assert_eq!(groups[0].count, 2);
        assert_eq!((groups[1].name.as_str(), groups[1].id), ("lif", 2));
        assert_eq!((groups[2].name.as_str(), groups[2].id), ("odd", 3));
    }

    #[test]
    fn test_ungrouped_rows_get_id_zero() {
        let files = vec![PathBuf::from("/d/a_1.tif"), PathBuf::from("/d/b.tif")];
        let config = GroupingConfig::with_rule(GroupRule::Underscore { start: 1, end: 2 });
        let table = Table::from_grouping(&Grouping::build(&files, &config)).unwrap();
        let b = table.rows().iter().find(|r| r.filename == "b.tif").unwrap();
        assert_eq!(b.group.as_deref(), Some(""));
        assert_eq!(b.group_id, Some(0));
        assert_eq!(table.groups().len(), 1);
    }

    #[test]
    fn test_disabled_grouping_has_no_groups() {
        let files = vec![PathBuf::from("/d/a_1.tif"), PathBuf::from("/d/b_1.tif")];
        let table = Table::from_grouping(&Grouping::build(&files, &GroupingConfig::default()))
            .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.groups().is_empty());
        assert!(table.rows().iter().all(|r| r.group_id == Some(0)));
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut table = grouped(&["ctrl_1.tif"]);
        let dup = table.rows()[0].clone();
        assert!(matches!(
            table.push(dup),
            Err(Error::DuplicateRecord { .. })
        ));
    }

    #[test]
    fn test_require_lists_all_missing_columns() {
        let table = grouped(&["ctrl_1.tif"]);
        assert!(table.require(&[Column::Filename, Column::Group]).is_ok());
        match table.require(&[Column::Threshold, Column::Filename, Column::Fraction]) {
            Err(Error::MissingColumns(cols)) => {
                assert_eq!(cols, vec![Column::Threshold, Column::Fraction]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_backfill_directory_inserts_after_filename() {
        let mut table = Table::with_columns(&[Column::Filename, Column::Group]);
        table.push(FileRecord::new("a.tif")).unwrap();
        table.push(FileRecord::new("b.tif")).unwrap();
        table.backfill_directory(Path::new("/new")).unwrap();
        assert_eq!(
            table.columns(),
            &[Column::Filename, Column::Directory, Column::Group]
        );
        assert!(table
            .rows()
            .iter()
            .all(|r| r.directory.as_deref() == Some(Path::new("/new"))));
    }

    #[test]
    fn test_threshold_and_fraction_columns_added_in_order() {
        let mut table = grouped(&["ctrl_1.tif", "ctrl_2.tif"]);
        table.set_fraction(1, Some(0.4)).unwrap();
        table.set_threshold(120.0);
        assert_eq!(
            table.columns(),
            &[
                Column::Filename,
                Column::Directory,
                Column::Group,
                Column::GroupId,
                Column::Threshold,
                Column::Fraction
            ]
        );
        assert_eq!(table.threshold(), Some(120.0));
        assert!(table.set_fraction(5, Some(0.1)).is_err());
        table.set_fraction(0, Some(f64::NAN)).unwrap();
        assert_eq!(table.rows()[0].fraction, None);
    }

    #[test]
    fn test_sorting() {
        let mut table = grouped(&["z_2.tif", "a_9.tif", "z_1.tif"]);
        table.sort_by_filename();
        let names: Vec<&str> = table.rows().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a_9.tif", "z_1.tif", "z_2.tif"]);

        table.sort_by_groups();
        let ids: Vec<u32> = table.rows().iter().filter_map(|r| r.group_id).collect();
        assert_eq!(ids, vec![1, 2, 2]);
        assert_eq!(table.group_rows("z").len(), 2);
    }
}
