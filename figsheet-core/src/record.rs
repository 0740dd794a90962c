//! File records and the column vocabulary of the tabular store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A column of the tabular store.
///
/// Declaration order is the canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Column {
    #[cfg_attr(feature = "serde", serde(rename = "Filename"))]
    Filename,
    #[cfg_attr(feature = "serde", serde(rename = "Directory"))]
    Directory,
    #[cfg_attr(feature = "serde", serde(rename = "Group"))]
    Group,
    #[cfg_attr(feature = "serde", serde(rename = "Group_ID"))]
    GroupId,
    #[cfg_attr(feature = "serde", serde(rename = "Threshold"))]
    Threshold,
    #[cfg_attr(feature = "serde", serde(rename = "Fraction"))]
    Fraction,
}

impl Column {
    /// All columns in canonical order.
    pub const ALL: [Column; 6] = [
        Column::Filename,
        Column::Directory,
        Column::Group,
        Column::GroupId,
        Column::Threshold,
        Column::Fraction,
    ];

    /// Columns every freshly built table carries.
    pub const BASE: [Column; 4] = [
        Column::Filename,
        Column::Directory,
        Column::Group,
        Column::GroupId,
    ];

    /// Canonical column name as it appears in persisted tables.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Column::Filename => "Filename",
            Column::Directory => "Directory",
            Column::Group => "Group",
            Column::GroupId => "Group_ID",
            Column::Threshold => "Threshold",
            Column::Fraction => "Fraction",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown column '{s}'"))
    }
}

/// One row of the tabular store: a single image file.
///
/// Optional fields are `Some` whenever the table carries the matching
/// column, except `fraction`, which may be absent per row (not computed or
/// failed to load).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileRecord {
    #[cfg_attr(feature = "serde", serde(rename = "Filename"))]
    pub filename: String,
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "Directory",
            default,
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub directory: Option<PathBuf>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Group", default, skip_serializing_if = "Option::is_none")
    )]
    pub group: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Group_ID", default, skip_serializing_if = "Option::is_none")
    )]
    pub group_id: Option<u32>,
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "Threshold",
            default,
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub threshold: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "Fraction", default))]
    pub fraction: Option<f64>,
}

impl FileRecord {
    /// Create a record with only a filename.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            directory: None,
            group: None,
            group_id: None,
            threshold: None,
            fraction: None,
        }
    }

    /// Create a grouped record for a file path.
    ///
    /// Returns `None` if the path has no file name component.
    #[must_use]
    pub fn from_path(path: &Path, group: &str, group_id: u32) -> Option<Self> {
        let filename = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            filename,
            directory: Some(path.parent().map(Path::to_path_buf).unwrap_or_default()),
            group: Some(group.to_string()),
            group_id: Some(group_id),
            threshold: None,
            fraction: None,
        })
    }

    /// Full path of the image file, if the directory is known.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.directory.as_ref().map(|d| d.join(&self.filename))
    }

    /// Group name, empty when ungrouped or unknown.
    #[must_use]
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }

    /// Fraction value if present and finite.
    #[must_use]
    pub fn valid_fraction(&self) -> Option<f64> {
        self.fraction.filter(|f| f.is_finite())
    }

    /// Render a single cell for tabular display.
    #[must_use]
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Filename => self.filename.clone(),
            Column::Directory => self
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
            Column::Group => self.group.clone().unwrap_or_default(),
            Column::GroupId => self.group_id.map(|g| g.to_string()).unwrap_or_default(),
            Column::Threshold => self.threshold.map(|t| format!("{t}")).unwrap_or_default(),
            Column::Fraction => self
                .fraction
                .map_or_else(|| "NaN".to_string(), |f| format!("{f:.4}")),
        }
    }

    /// Filename with the group prefix and leading separators removed.
    ///
    /// Falls back to the full filename when nothing would remain.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let group = self.group_name();
        if group.is_empty() {
            return &self.filename;
        }
        match self.filename.strip_prefix(group) {
            Some(rest) => {
                let trimmed = rest.trim_start_matches(['_', '-', ' ']);
                if trimmed.is_empty() {
                    &self.filename
                } else {
                    trimmed
                }
            }
            None => &self.filename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(column.name().parse::<Column>().unwrap(), column);
        }
        assert!("group_id".parse::<Column>().is_err());
    }

    #[test]
    fn test_display_name_strips_group_prefix() {
        let mut record = FileRecord::new("Ctrl_A_00h_01.tif");
        record.group = Some("Ctrl_A".to_string());
        assert_eq!(record.display_name(), "00h_01.tif");

        record.group = Some("Other".to_string());
        assert_eq!(record.display_name(), "Ctrl_A_00h_01.tif");

        let mut whole = FileRecord::new("Ctrl");
        whole.group = Some("Ctrl".to_string());
        assert_eq!(whole.display_name(), "Ctrl");
    }

    #[test]
    fn test_from_path_uses_parent_directory() {
        let record = FileRecord::from_path(Path::new("/data/run1/img_01.tif"), "img", 1).unwrap();
        assert_eq!(record.filename, "img_01.tif");
        assert_eq!(record.directory.as_deref(), Some(Path::new("/data/run1")));
        assert_eq!(
            record.path().unwrap(),
            PathBuf::from("/data/run1/img_01.tif")
        );
    }

    #[test]
    fn test_fraction_cell_shows_nan_when_absent() {
        let record = FileRecord::new("a.tif");
        assert_eq!(record.cell(Column::Fraction), "NaN");
        assert!(record.valid_fraction().is_none());
    }
}
