//! Incremental preview manager.
//!
//! Keeps one rendered sheet per selected group and, when the selection or
//! the display options change, re-renders only what differs. Rebuilds are
//! debounced and rendered in bounded batches so a UI can keep pumping
//! events between them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::cache::SheetCache;
use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use crate::display::DisplayOptions;
use crate::record::FileRecord;
use crate::table::Table;

/// Default number of sheets rendered per poll.
pub const DEFAULT_RENDERS_PER_POLL: usize = 1;

/// Everything a renderer needs for one group.
#[derive(Debug, Clone)]
pub struct GroupSheetInput<'a> {
    pub group: &'a str,
    pub group_id: u32,
    pub threshold: Option<f64>,
    pub rows: Vec<&'a FileRecord>,
}

impl<'a> GroupSheetInput<'a> {
    /// Collect a group's rows from a table.
    ///
    /// Returns `None` if the table has no rows for `group`.
    #[must_use]
    pub fn from_table(table: &'a Table, group: &'a str) -> Option<Self> {
        let group_id = table.group_id(group)?;
        Some(Self {
            group,
            group_id,
            threshold: table.threshold(),
            rows: table.group_rows(group),
        })
    }

    /// Sheet title, e.g. `"Ctrl_A (ID: 1)"`.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} (ID: {})", self.group, self.group_id)
    }
}

/// Produces one sheet per group.
pub trait SheetRenderer {
    type Sheet;
    type Error: Display;

    /// Render the sheet of one group.
    ///
    /// # Errors
    /// Implementations fail only for whole-sheet problems; per-file load
    /// failures are drawn into the sheet.
    fn render(
        &mut self,
        input: &GroupSheetInput<'_>,
        options: &DisplayOptions,
    ) -> Result<Self::Sheet, Self::Error>;
}

/// What a single poll changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether a debounced diff pass started during this poll.
    pub rebuilt: bool,
    pub removed: Vec<String>,
    pub added: Vec<String>,
    /// Groups still waiting to be rendered.
    pub remaining: usize,
}

impl PollOutcome {
    /// Whether the displayed sheets changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.removed.is_empty() || !self.added.is_empty()
    }
}

/// Selection-driven, debounced sheet cache.
#[derive(Debug)]
pub struct PreviewManager<S> {
    cache: SheetCache<S>,
    selected: BTreeSet<String>,
    options: DisplayOptions,
    pending: VecDeque<String>,
    failed: BTreeMap<String, String>,
    invalidated: bool,
    debouncer: Debouncer,
    renders_per_poll: usize,
}

impl<S> Default for PreviewManager<S> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, DEFAULT_RENDERS_PER_POLL)
    }
}

impl<S> PreviewManager<S> {
    #[must_use]
    pub fn new(debounce: Duration, renders_per_poll: usize) -> Self {
        Self {
            cache: SheetCache::new(),
            selected: BTreeSet::new(),
            options: DisplayOptions::default(),
            pending: VecDeque::new(),
            failed: BTreeMap::new(),
            invalidated: false,
            debouncer: Debouncer::new(debounce),
            renders_per_poll: renders_per_poll.max(1),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &SheetCache<S> {
        &self.cache
    }

    #[must_use]
    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    #[must_use]
    pub fn is_selected(&self, group: &str) -> bool {
        self.selected.contains(group)
    }

    #[must_use]
    pub fn options(&self) -> DisplayOptions {
        self.options
    }

    /// Groups whose last render failed, with the reason.
    #[must_use]
    pub fn failed(&self) -> &BTreeMap<String, String> {
        &self.failed
    }

    /// Whether a rebuild is scheduled or still rendering.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.debouncer.is_pending() || !self.pending.is_empty()
    }

    /// Time until the scheduled rebuild starts.
    #[must_use]
    pub fn time_until_rebuild(&self, now: Instant) -> Option<Duration> {
        self.debouncer.remaining(now)
    }

    /// Sheets in display order (ascending group ID).
    #[must_use]
    pub fn sheets(&self) -> Vec<(&str, &S)> {
        self.cache.ordered()
    }

    /// Select or deselect one group.
    pub fn toggle(&mut self, group: &str, on: bool, now: Instant) {
        let changed = if on {
            self.selected.insert(group.to_string())
        } else {
            self.failed.remove(group);
            self.selected.remove(group)
        };
        if changed {
            self.debouncer.trigger(now);
        }
    }

    /// Replace the whole selection.
    pub fn set_selected<I, T>(&mut self, groups: I, now: Instant)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let next: BTreeSet<String> = groups.into_iter().map(Into::into).collect();
        if next != self.selected {
            self.failed.retain(|k, _| next.contains(k));
            self.selected = next;
            self.debouncer.trigger(now);
        }
    }

    /// Change the global display toggles; every sheet is regenerated.
    pub fn set_options(&mut self, options: DisplayOptions, now: Instant) {
        if options != self.options {
            self.options = options;
            self.invalidate_all(now);
        }
    }

    /// Force regeneration of every selected sheet (e.g. after a table reload).
    pub fn invalidate_all(&mut self, now: Instant) {
        self.invalidated = true;
        self.debouncer.trigger(now);
    }

    /// Drop all sheets and the selection.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.selected.clear();
        self.pending.clear();
        self.failed.clear();
        self.invalidated = false;
        self.debouncer.cancel();
    }

    /// Advance the manager: start a diff pass if the debounce elapsed and
    /// render at most one batch of pending groups.
    pub fn poll<R>(&mut self, now: Instant, table: &Table, renderer: &mut R) -> PollOutcome
    where
        R: SheetRenderer<Sheet = S>,
    {
        let mut outcome = PollOutcome::default();
        if self.debouncer.take_due(now) {
            outcome.rebuilt = true;
            outcome.removed = self.start_pass(table);
        }
        outcome.added = self.render_batch(table, renderer, self.renders_per_poll);
        outcome.remaining = self.pending.len();
        outcome
    }

    /// Run a full diff pass immediately, rendering everything pending.
    pub fn rebuild_now<R>(&mut self, table: &Table, renderer: &mut R) -> PollOutcome
    where
        R: SheetRenderer<Sheet = S>,
    {
        self.debouncer.cancel();
        let removed = self.start_pass(table);
        let added = self.render_batch(table, renderer, usize::MAX);
        PollOutcome {
            rebuilt: true,
            removed,
            added,
            remaining: self.pending.len(),
        }
    }

    fn start_pass(&mut self, table: &Table) -> Vec<String> {
        if self.invalidated {
            log::debug!("display options changed, clearing {} sheets", self.cache.len());
            self.cache.clear();
            self.failed.clear();
            self.invalidated = false;
        }

        let to_remove: Vec<String> = self
            .cache
            .keys()
            .filter(|k| !self.selected.contains(*k))
            .map(str::to_string)
            .collect();
        for key in &to_remove {
            self.cache.evict(key);
        }

        let mut to_add: Vec<(u32, String)> = self
            .selected
            .iter()
            .filter(|g| !self.cache.contains(g) && !self.failed.contains_key(*g))
            .filter_map(|g| match table.group_id(g) {
                Some(id) => Some((id, g.clone())),
                None => {
                    log::debug!("group {g} not in table, skipping");
                    None
                }
            })
            .collect();
        to_add.sort();
        self.pending = to_add.into_iter().map(|(_, g)| g).collect();

        log::debug!(
            "preview diff: {} removed, {} to render",
            to_remove.len(),
            self.pending.len()
        );
        to_remove
    }

    fn render_batch<R>(&mut self, table: &Table, renderer: &mut R, limit: usize) -> Vec<String>
    where
        R: SheetRenderer<Sheet = S>,
    {
        let mut added = Vec::new();
        while added.len() < limit {
            let Some(group) = self.pending.pop_front() else {
                break;
            };
            if !self.selected.contains(&group) || self.cache.contains(&group) {
                continue;
            }
            let Some(input) = GroupSheetInput::from_table(table, &group) else {
                continue;
            };
            match renderer.render(&input, &self.options) {
                Ok(sheet) => {
                    self.cache.upsert(group.clone(), input.group_id, sheet);
                    added.push(group);
                }
                Err(e) => {
                    log::warn!("failed to render sheet for {group}: {e}");
                    self.failed.insert(group, e.to_string());
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{GroupRule, Grouping, GroupingConfig};
    use std::convert::Infallible;
    use std::path::PathBuf;

    struct Counting {
        calls: usize,
    }

    impl SheetRenderer for Counting {
        type Sheet = (String, bool);
        type Error = Infallible;

        fn render(
            &mut self,
            input: &GroupSheetInput<'_>,
            options: &DisplayOptions,
        ) -> Result<Self::Sheet, Infallible> {
            self.calls += 1;
            Ok((input.title(), options.log_scale))
        }
    }

    fn table() -> Table {
        let files: Vec<PathBuf> = ["b_1.tif", "a_1.tif", "c_1.tif", "a_2.tif"]
            .iter()
            .map(|n| PathBuf::from("/d").join(n))
            .collect();
        let config = GroupingConfig::with_rule(GroupRule::Underscore { start: 0, end: 1 });
        Table::from_grouping(&Grouping::build(&files, &config)).unwrap()
    }

    #[test]
    fn test_poll_waits_for_debounce_and_batches() {
        let table = table();
        let mut renderer = Counting { calls: 0 };
        let mut manager: PreviewManager<(String, bool)> =
            PreviewManager::new(Duration::from_millis(300), 1);
        let t0 = Instant::now();
        manager.set_selected(["c", "a"], t0);

        let early = manager.poll(t0 + Duration::from_millis(100), &table, &mut renderer);
        assert!(!early.rebuilt);
        assert_eq!(renderer.calls, 0);

        let first = manager.poll(t0 + Duration::from_millis(300), &table, &mut renderer);
        assert!(first.rebuilt);
        assert_eq!(first.added, vec!["a"]);
        assert_eq!(first.remaining, 1);

        let second = manager.poll(t0 + Duration::from_millis(316), &table, &mut renderer);
        assert!(!second.rebuilt);
        assert_eq!(second.added, vec!["c"]);
        assert_eq!(second.remaining, 0);
        assert!(!manager.is_busy());

        let order: Vec<&str> = manager.sheets().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "c"]);
    }

    #[test]
    fn test_deselect_during_batch_skips_render() {
        let table = table();
        let mut renderer = Counting { calls: 0 };
        let mut manager = PreviewManager::new(Duration::ZERO, 1);
        let t0 = Instant::now();
        manager.set_selected(["a", "b"], t0);
        manager.poll(t0, &table, &mut renderer);
        manager.selected.remove("b");
        let out = manager.poll(t0, &table, &mut renderer);
        assert!(out.added.is_empty());
        assert_eq!(renderer.calls, 1);
    }

    #[test]
    fn test_unknown_group_is_skipped() {
        let table = table();
        let mut renderer = Counting { calls: 0 };
        let mut manager = PreviewManager::default();
        manager.set_selected(["a", "missing"], Instant::now());
        let out = manager.rebuild_now(&table, &mut renderer);
        assert_eq!(out.added, vec!["a"]);
        assert_eq!(manager.cache().len(), 1);
    }

    #[test]
    fn test_failed_render_is_not_retried() {
        struct Failing;
        impl SheetRenderer for Failing {
            type Sheet = ();
            type Error = &'static str;
            fn render(
                &mut self,
                _: &GroupSheetInput<'_>,
                _: &DisplayOptions,
            ) -> Result<(), &'static str> {
                Err("backend")
            }
        }
        let table = table();
        let mut manager = PreviewManager::default();
        manager.set_selected(["a"], Instant::now());
        manager.rebuild_now(&table, &mut Failing);
        assert_eq!(manager.failed().get("a").map(String::as_str), Some("backend"));
        let again = manager.rebuild_now(&table, &mut Failing);
        assert!(again.added.is_empty());
        assert_eq!(again.remaining, 0);
    }
}
