//! Selection model for timepoint comparison reports.
//!
//! A report figure has one row per condition/replicate and one column per
//! timepoint. Each cell refers to one file of the source table.

use std::collections::BTreeMap;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{Column, FileRecord};
use crate::table::Table;

/// A timepoint column and the filename pattern that identifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timepoint {
    pub label: String,
    pub pattern: String,
}

impl Timepoint {
    #[must_use]
    pub fn new(label: &str, pattern: &str) -> Self {
        Self {
            label: label.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

/// Row labels and timepoints of a report figure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReportLayout {
    pub row_labels: Vec<String>,
    pub timepoints: Vec<Timepoint>,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            row_labels: ["Ctrl #1", "Ctrl #2", "TNFa #1", "TNFa #2", "LIF #1", "LIF #2"]
                .into_iter()
                .map(String::from)
                .collect(),
            timepoints: vec![
                Timepoint::new("0h", "00h"),
                Timepoint::new("2h", "02h"),
                Timepoint::new("4h", "04h"),
                Timepoint::new("6h", "06h"),
                Timepoint::new("24h", "24h"),
                Timepoint::new("48h", "48h"),
            ],
        }
    }
}

impl ReportLayout {
    /// Timepoints whose pattern occurs in `filename`, in column order.
    pub fn matching_timepoints<'a>(
        &'a self,
        filename: &'a str,
    ) -> impl Iterator<Item = &'a Timepoint> + 'a {
        self.timepoints
            .iter()
            .filter(move |tp| filename.contains(tp.pattern.as_str()))
    }

    /// Timepoint labels in column order.
    pub fn timepoint_labels(&self) -> impl Iterator<Item = &str> {
        self.timepoints.iter().map(|tp| tp.label.as_str())
    }
}

/// Metadata of one selected file, copied out of the source table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectedFile {
    #[cfg_attr(feature = "serde", serde(rename = "Filename"))]
    pub filename: String,
    #[cfg_attr(feature = "serde", serde(rename = "Directory"))]
    pub directory: PathBuf,
    #[cfg_attr(feature = "serde", serde(rename = "Group", default))]
    pub group: String,
    #[cfg_attr(feature = "serde", serde(rename = "Group_ID", default))]
    pub group_id: u32,
    #[cfg_attr(feature = "serde", serde(rename = "Fraction", default))]
    pub fraction: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "Threshold", default))]
    pub threshold: Option<f64>,
}

impl SelectedFile {
    /// Copy a table record. Returns `None` if its directory is unknown.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Option<Self> {
        Some(Self {
            filename: record.filename.clone(),
            directory: record.directory.clone()?,
            group: record.group_name().to_string(),
            group_id: record.group_id.unwrap_or(0),
            fraction: record.valid_fraction(),
            threshold: record.threshold,
        })
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Selected files of one row, keyed by timepoint label.
pub type RowSelection = BTreeMap<String, SelectedFile>;

/// Result of pattern-based auto selection for one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoSelection {
    pub selected: RowSelection,
    /// Timepoint labels with no matching file, in column order.
    pub missing: Vec<String>,
}

/// Pick, for each timepoint, the first file whose name contains its pattern.
///
/// Each file fills at most one timepoint: the first still-empty one whose
/// pattern it contains.
#[must_use]
pub fn auto_select(rows: &[&FileRecord], layout: &ReportLayout) -> AutoSelection {
    let mut selected = RowSelection::new();
    for record in rows {
        let Some(tp) = layout
            .matching_timepoints(&record.filename)
            .find(|tp| !selected.contains_key(&tp.label))
        else {
            continue;
        };
        if let Some(file) = SelectedFile::from_record(record) {
            selected.insert(tp.label.clone(), file);
        }
    }
    let missing = layout
        .timepoint_labels()
        .filter(|l| !selected.contains_key(*l))
        .map(str::to_string)
        .collect();
    AutoSelection { selected, missing }
}

/// One report figure: name, source table and per-row selections.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FigureSelection {
    /// Stable identifier of the figure within the report.
    pub key: String,
    pub figure_name: String,
    pub threshold: Option<f64>,
    pub source_table: PathBuf,
    /// Row label to its timepoint selections.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rows: BTreeMap<String, RowSelection>,
}

impl FigureSelection {
    /// Build a figure by auto-selecting each row from a table group.
    ///
    /// `row_groups` pairs row labels with group names. Returns the figure
    /// and, per row, the missing timepoints.
    ///
    /// # Errors
    /// Returns `MissingColumns` if the table lacks any report column and
    /// `UnknownGroup` for a group absent from the table.
    pub fn auto(
        key: &str,
        figure_name: &str,
        table: &Table,
        source_table: PathBuf,
        row_groups: &[(String, String)],
        layout: &ReportLayout,
    ) -> Result<(Self, Vec<(String, Vec<String>)>)> {
        table.require(&Column::ALL)?;

        let mut rows = BTreeMap::new();
        let mut missing = Vec::new();
        for (label, group) in row_groups {
            let members = table.group_rows(group);
            if members.is_empty() {
                return Err(Error::UnknownGroup(group.clone()));
            }
            let auto = auto_select(&members, layout);
            if !auto.missing.is_empty() {
                log::warn!(
                    "{figure_name} / {label}: no files for {}",
                    auto.missing.join(", ")
                );
                missing.push((label.clone(), auto.missing));
            }
            rows.insert(label.clone(), auto.selected);
        }

        Ok((
            Self {
                key: key.to_string(),
                figure_name: figure_name.to_string(),
                threshold: table.threshold(),
                source_table,
                rows,
            },
            missing,
        ))
    }

    /// Selection for one row label.
    #[must_use]
    pub fn row(&self, label: &str) -> Option<&RowSelection> {
        self.rows.get(label)
    }

    /// Shared scatter y-limit: `1.1 * max` of valid fractions, or 1.0.
    #[must_use]
    pub fn fraction_axis_max(&self) -> f64 {
        let max = self
            .rows
            .values()
            .flat_map(BTreeMap::values)
            .filter_map(|f| f.fraction.filter(|v| v.is_finite()))
            .fold(f64::NEG_INFINITY, f64::max);
        if max.is_finite() && max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }
}

/// The persisted report: layout plus every figure.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportSelection {
    #[cfg_attr(feature = "serde", serde(default))]
    pub layout: ReportLayout,
    pub figures: Vec<FigureSelection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(name: &str, fraction: Option<f64>) -> FileRecord {
        let mut r = FileRecord::new(name);
        r.directory = Some(PathBuf::from("/d"));
        r.group = Some("Ctrl".into());
        r.group_id = Some(1);
        r.threshold = Some(10.0);
        r.fraction = fraction;
        r
    }

    #[test]
    fn test_auto_select_first_match_wins() {
        let records = [
            record("Ctrl_00h_a.tif", Some(0.1)),
            record("Ctrl_00h_b.tif", Some(0.2)),
            record("Ctrl_24h.tif", Some(0.3)),
            record("Ctrl_misc.tif", None),
        ];
        let refs: Vec<&FileRecord> = records.iter().collect();
        let auto = auto_select(&refs, &ReportLayout::default());
        assert_eq!(auto.selected["0h"].filename, "Ctrl_00h_a.tif");
        assert_eq!(auto.selected["24h"].filename, "Ctrl_24h.tif");
        assert_eq!(auto.missing, vec!["2h", "4h", "6h", "48h"]);
    }

    #[test]
    fn test_fraction_axis_max() {
        let mut fig = FigureSelection {
            key: "a".into(),
            figure_name: "A".into(),
            threshold: Some(10.0),
            source_table: PathBuf::from("/t.json"),
            rows: BTreeMap::new(),
        };
        assert_relative_eq!(fig.fraction_axis_max(), 1.0);

        let records = [record("x_00h.tif", Some(0.5)), record("x_02h.tif", None)];
        let refs: Vec<&FileRecord> = records.iter().collect();
        fig.rows.insert(
            "Ctrl #1".into(),
            auto_select(&refs, &ReportLayout::default()).selected,
        );
        assert_relative_eq!(fig.fraction_axis_max(), 0.55);
    }

    #[test]
    fn test_matching_timepoints() {
        let layout = ReportLayout::default();
        let labels: Vec<&str> = layout
            .matching_timepoints("a_00h_48h.tif")
            .map(|tp| tp.label.as_str())
            .collect();
        assert_eq!(labels, vec!["0h", "48h"]);
        assert!(layout.matching_timepoints("a_12h.tif").next().is_none());
    }

    #[test]
    fn test_auto_select_falls_through_to_free_timepoint() {
        let records = [
            record("Ctrl_00h_a.tif", Some(0.1)),
            record("Ctrl_00h_24h.tif", Some(0.4)),
        ];
        let refs: Vec<&FileRecord> = records.iter().collect();
        let auto = auto_select(&refs, &ReportLayout::default());
        assert_eq!(auto.selected["0h"].filename, "Ctrl_00h_a.tif");
        assert_eq!(auto.selected["24h"].filename, "Ctrl_00h_24h.tif");
        assert_eq!(auto.missing, vec!["2h", "4h", "6h", "48h"]);
    }
}
