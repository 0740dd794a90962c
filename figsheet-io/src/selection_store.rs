//! Report selection persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use figsheet_core::ReportSelection;

use crate::{Error, Result};

/// File name of the selection written next to generated reports.
pub const SELECTION_FILENAME: &str = "figure_selections.json";

/// Write a report selection as JSON.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn save_selection<P: AsRef<Path>>(path: P, selection: &ReportSelection) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, selection)?;
    writer.flush()?;
    log::info!(
        "saved selection for {} figures to {}",
        selection.figures.len(),
        path.display()
    );
    Ok(())
}

/// Read and validate a report selection.
///
/// # Errors
/// Returns `InvalidSelection` if the document has no figures, a figure has
/// no name, or a selected file lacks a filename or directory.
pub fn load_selection<P: AsRef<Path>>(path: P) -> Result<ReportSelection> {
    let selection: ReportSelection =
        serde_json::from_reader(BufReader::new(File::open(path.as_ref())?))?;
    validate(&selection)?;
    Ok(selection)
}

fn validate(selection: &ReportSelection) -> Result<()> {
    if selection.figures.is_empty() {
        return Err(Error::InvalidSelection("no figures".into()));
    }
    for figure in &selection.figures {
        if figure.figure_name.trim().is_empty() {
            return Err(Error::InvalidSelection(format!(
                "figure '{}' has no name",
                figure.key
            )));
        }
        for (row, files) in &figure.rows {
            for (tp, file) in files {
                if file.filename.is_empty() || file.directory.as_os_str().is_empty() {
                    return Err(Error::InvalidSelection(format!(
                        "{} / {row} / {tp}: missing Filename or Directory",
                        figure.figure_name
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figsheet_core::{FigureSelection, SelectedFile};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn figure(name: &str, directory: &str) -> FigureSelection {
        let mut row = BTreeMap::new();
        row.insert(
            "0h".to_string(),
            SelectedFile {
                filename: "ctrl_00h.tif".into(),
                directory: PathBuf::from(directory),
                group: "ctrl".into(),
                group_id: 1,
                fraction: Some(0.4),
                threshold: Some(100.0),
            },
        );
        let mut rows = BTreeMap::new();
        rows.insert("Ctrl #1".to_string(), row);
        FigureSelection {
            key: "fig1".into(),
            figure_name: name.into(),
            threshold: Some(100.0),
            source_table: PathBuf::from("/t/table.json"),
            rows,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SELECTION_FILENAME);
        let selection = ReportSelection {
            figures: vec![figure("(STAT3)-Lemon", "/data")],
            ..ReportSelection::default()
        };
        save_selection(&path, &selection).unwrap();
        assert_eq!(load_selection(&path).unwrap(), selection);
    }

    #[test]
    fn test_rejects_incomplete_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SELECTION_FILENAME);

        let selection = ReportSelection {
            figures: vec![figure("Fig", "")],
            ..ReportSelection::default()
        };
        save_selection(&path, &selection).unwrap();
        assert!(matches!(
            load_selection(&path),
            Err(Error::InvalidSelection(_))
        ));

        save_selection(&path, &ReportSelection::default()).unwrap();
        assert!(matches!(
            load_selection(&path),
            Err(Error::InvalidSelection(_))
        ));
    }
}
