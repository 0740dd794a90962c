//! Filename-pattern grouping of imported files.
//!
//! A [`GroupRule`] extracts a key from each filename stem; files sharing a
//! key form a group. Files the rule cannot key land in [`UNGROUPED_KEY`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bucket for files whose key could not be extracted.
pub const UNGROUPED_KEY: &str = "_ungrouped";

/// Single implicit group used when grouping is disabled.
pub const ALL_KEY: &str = "all";

/// Rule for extracting a group key from a filename stem.
///
/// Ranges are 0-indexed and half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "selector", rename_all = "snake_case"))]
pub enum GroupRule {
    /// Segments `[start, end)` of the stem split on `_`, re-joined with `_`.
    Underscore { start: usize, end: usize },
    /// Characters `[start, end)` of the stem.
    Characters { start: usize, end: usize },
}

impl Default for GroupRule {
    fn default() -> Self {
        GroupRule::Underscore { start: 0, end: 1 }
    }
}

impl GroupRule {
    /// Character rule from a 1-indexed, inclusive user range ("from 1 to 6").
    ///
    /// # Errors
    /// Returns `InvalidRule` if `from` is zero or `to < from`.
    pub fn from_one_based_chars(from: usize, to: usize) -> Result<Self> {
        if from == 0 || to < from {
            return Err(Error::InvalidRule(format!(
                "character range {from}..={to} must satisfy 1 <= from <= to"
            )));
        }
        Ok(GroupRule::Characters {
            start: from - 1,
            end: to,
        })
    }

    /// Parse a `start:end` range string into `(start, end)`.
    ///
    /// # Errors
    /// Returns `InvalidRule` if the string is not two integers separated by `:`.
    pub fn parse_range(s: &str) -> Result<(usize, usize)> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidRule(format!("expected START:END, got '{s}'")))?;
        let start = a
            .trim()
            .parse()
            .map_err(|_| Error::InvalidRule(format!("invalid start '{a}'")))?;
        let end = b
            .trim()
            .parse()
            .map_err(|_| Error::InvalidRule(format!("invalid end '{b}'")))?;
        Ok((start, end))
    }

    /// Extract the group key for a filename (extension is ignored).
    ///
    /// Returns `None` if the range is out of bounds, empty, or selects an
    /// empty string.
    #[must_use]
    pub fn key_for(&self, filename: &str) -> Option<String> {
        let stem = file_stem(filename);
        let key = match *self {
            GroupRule::Underscore { start, end } => {
                let parts: Vec<&str> = stem.split('_').collect();
                if start >= parts.len() || end > parts.len() || start >= end {
                    return None;
                }
                parts[start..end].join("_")
            }
            GroupRule::Characters { start, end } => {
                let len = stem.chars().count();
                if end > len || start >= end {
                    return None;
                }
                stem.chars().skip(start).take(end - start).collect()
            }
        };
        (!key.is_empty()).then_some(key)
    }
}

fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Grouping configuration: on/off plus the active rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GroupingConfig {
    /// Whether files are arranged in groups at all.
    pub enabled: bool,
    /// Rule applied when enabled.
    pub rule: GroupRule,
}

impl GroupingConfig {
    /// Enabled configuration with the given rule.
    #[must_use]
    pub fn with_rule(rule: GroupRule) -> Self {
        Self {
            enabled: true,
            rule,
        }
    }
}

/// Summary of the first group, as shown before committing to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupPreview {
    /// Alphabetically first group and its sorted filenames.
    pub first: Option<(String, Vec<String>)>,
    /// Number of keyed groups (excluding the fallback bucket).
    pub group_count: usize,
    /// Number of files that could not be keyed.
    pub ungrouped_count: usize,
}

/// Files partitioned into named groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grouping {
    enabled: bool,
    groups: BTreeMap<String, Vec<PathBuf>>,
}

impl Grouping {
    /// Partition `files` according to `config`.
    ///
    /// Every file ends up in exactly one bucket. With grouping disabled all
    /// files share the single [`ALL_KEY`] group, which exists even when
    /// `files` is empty.
    #[must_use]
    pub fn build(files: &[PathBuf], config: &GroupingConfig) -> Self {
        let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        if !config.enabled {
            groups.insert(ALL_KEY.to_string(), files.to_vec());
            return Self {
                enabled: false,
                groups,
            };
        }

        for path in files {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let key = config
                .rule
                .key_for(&filename)
                .unwrap_or_else(|| UNGROUPED_KEY.to_string());
            groups.entry(key).or_default().push(path.clone());
        }

        log::debug!(
            "grouped {} files into {} buckets",
            files.len(),
            groups.len()
        );

        Self {
            enabled: true,
            groups,
        }
    }

    /// Whether this grouping came from an enabled rule.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// All buckets, keyed and sorted by name.
    #[must_use]
    pub fn groups(&self) -> &BTreeMap<String, Vec<PathBuf>> {
        &self.groups
    }

    /// Files of one bucket.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[PathBuf]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Number of buckets, including the fallback bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of files across all buckets.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Preview of the first keyed group.
    #[must_use]
    pub fn preview(&self) -> GroupPreview {
        let ungrouped_count = self.get(UNGROUPED_KEY).map_or(0, <[PathBuf]>::len);
        let mut keyed = self
            .groups
            .iter()
            .filter(|(k, _)| self.enabled && k.as_str() != UNGROUPED_KEY);
        let group_count = keyed.clone().count();
        let first = keyed.next().map(|(key, files)| {
            let mut names: Vec<String> = files
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            names.sort();
            (key.clone(), names)
        });
        GroupPreview {
            first,
            group_count,
            ungrouped_count,
        }
    }
}
