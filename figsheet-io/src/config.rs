//! Application configuration file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use figsheet_core::{Colormap, GroupingConfig, ReportLayout};
use serde::{Deserialize, Serialize};

use crate::Result;

/// User-tunable settings shared by the CLI and the GUI.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigsheetConfig {
    /// Filename grouping used when building new tables.
    pub grouping: GroupingConfig,
    /// Heatmap colormap.
    pub colormap: Colormap,
    /// Delay between the last group toggle and the preview rebuild.
    pub preview_debounce_ms: u64,
    /// Sheets rendered per UI frame during a preview rebuild.
    pub renders_per_poll: usize,
    /// Resolution of exported PNG files.
    pub export_dpi: u32,
    /// Upper bound on heatmap cells per axis; larger images are
    /// block-averaged.
    pub heatmap_max_cells: usize,
    /// Rows and timepoints of report figures.
    pub report: ReportLayout,
}

impl Default for FigsheetConfig {
    fn default() -> Self {
        Self {
            grouping: GroupingConfig::default(),
            colormap: Colormap::default(),
            preview_debounce_ms: 300,
            renders_per_poll: 1,
            export_dpi: 300,
            heatmap_max_cells: 128,
            report: ReportLayout::default(),
        }
    }
}

impl FigsheetConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds out-of-range values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid JSON or holds
    /// out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `ConfigError` naming the first offending field.
    pub fn validate(&self) -> figsheet_core::Result<()> {
        let err = |msg: &str| Err(figsheet_core::Error::ConfigError(msg.to_string()));
        if self.export_dpi == 0 {
            return err("export_dpi must be positive");
        }
        if self.heatmap_max_cells == 0 {
            return err("heatmap_max_cells must be positive");
        }
        if self.renders_per_poll == 0 {
            return err("renders_per_poll must be positive");
        }
        if self.report.timepoints.is_empty() || self.report.row_labels.is_empty() {
            return err("report layout needs at least one row and one timepoint");
        }
        Ok(())
    }

    /// Preview debounce as a `Duration`.
    #[must_use]
    pub fn preview_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.preview_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figsheet_core::GroupRule;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{
            "grouping": {"enabled": true, "rule": {"selector": "characters", "start": 0, "end": 6}},
            "colormap": "hot"
        }"#;
        let config = FigsheetConfig::from_json(json).unwrap();
        assert!(config.grouping.enabled);
        assert_eq!(
            config.grouping.rule,
            GroupRule::Characters { start: 0, end: 6 }
        );
        assert_eq!(config.colormap, Colormap::Hot);
        assert_eq!(config.export_dpi, 300);
        assert_eq!(config.report.timepoints.len(), 6);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(
            FigsheetConfig::from_json("{}").unwrap(),
            FigsheetConfig::default()
        );
    }

    #[test]
    fn test_rejects_zero_dpi() {
        assert!(FigsheetConfig::from_json(r#"{"export_dpi": 0}"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"preview_debounce_ms": 50}"#).unwrap();
        let config = FigsheetConfig::from_file(file.path()).unwrap();
        assert_eq!(config.preview_debounce().as_millis(), 50);
    }
}
