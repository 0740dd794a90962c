use std::convert::Infallible;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use figsheet_core::{
    DisplayOptions, GroupRule, GroupSheetInput, Grouping, GroupingConfig, PreviewManager,
    SheetRenderer, Table,
};

/// Renders a sheet as a description of its inputs and counts calls.
#[derive(Default)]
struct Recorder {
    calls: usize,
}

impl SheetRenderer for Recorder {
    type Sheet = String;
    type Error = Infallible;

    fn render(
        &mut self,
        input: &GroupSheetInput<'_>,
        options: &DisplayOptions,
    ) -> Result<String, Infallible> {
        self.calls += 1;
        Ok(format!(
            "{} rows={} log={} norm={}",
            input.title(),
            input.rows.len(),
            options.log_scale,
            options.normalize
        ))
    }
}

fn table() -> Table {
    let files: Vec<PathBuf> = [
        "ctrl_00h.tif",
        "ctrl_02h.tif",
        "tnfa_00h.tif",
        "lif_00h.tif",
        "lif_24h.tif",
    ]
    .iter()
    .map(|n| PathBuf::from("/data").join(n))
    .collect();
    let config = GroupingConfig::with_rule(GroupRule::Underscore { start: 0, end: 1 });
    let mut table = Table::from_grouping(&Grouping::build(&files, &config)).unwrap();
    table.set_threshold(50.0);
    table
}

fn snapshot(manager: &PreviewManager<String>) -> Vec<(String, String)> {
    manager
        .sheets()
        .into_iter()
        .map(|(k, s)| (k.to_string(), s.clone()))
        .collect()
}

fn settle(manager: &mut PreviewManager<String>, table: &Table, renderer: &mut Recorder, t: Instant) {
    let mut now = t + Duration::from_millis(300);
    while manager.is_busy() {
        manager.poll(now, table, renderer);
        now += Duration::from_millis(16);
    }
}

#[test]
fn test_toggle_off_then_on_restores_identical_sheets() {
    let table = table();
    let mut renderer = Recorder::default();
    let mut manager = PreviewManager::default();
    let t0 = Instant::now();

    manager.set_selected(["ctrl", "lif", "tnfa"], t0);
    settle(&mut manager, &table, &mut renderer, t0);
    let before = snapshot(&manager);
    assert_eq!(before.len(), 3);

    let t1 = t0 + Duration::from_secs(5);
    manager.toggle("lif", false, t1);
    settle(&mut manager, &table, &mut renderer, t1);
    assert_eq!(manager.cache().len(), 2);

    let t2 = t1 + Duration::from_secs(5);
    manager.toggle("lif", true, t2);
    settle(&mut manager, &table, &mut renderer, t2);
    assert_eq!(snapshot(&manager), before);
    assert_eq!(renderer.calls, 4);
}

#[test]
fn test_burst_of_toggles_triggers_one_pass() {
    let table = table();
    let mut renderer = Recorder::default();
    let mut manager = PreviewManager::new(Duration::from_millis(300), usize::MAX);
    let t0 = Instant::now();

    for i in 0..10u64 {
        manager.toggle("ctrl", i % 2 == 0, t0 + Duration::from_millis(i * 20));
    }
    let mut passes = 0;
    for step in 0..100u64 {
        let out = manager.poll(t0 + Duration::from_millis(step * 10), &table, &mut renderer);
        if out.rebuilt {
            passes += 1;
        }
    }
    assert_eq!(passes, 1);
    // Ten toggles starting with "on" end with "off".
    assert!(manager.cache().is_empty());
    assert_eq!(renderer.calls, 0);
}

#[test]
fn test_option_change_regenerates_every_sheet() {
    let table = table();
    let mut renderer = Recorder::default();
    let mut manager = PreviewManager::default();
    let t0 = Instant::now();
    manager.set_selected(["ctrl", "tnfa"], t0);
    settle(&mut manager, &table, &mut renderer, t0);
    assert_eq!(renderer.calls, 2);

    let t1 = t0 + Duration::from_secs(5);
    manager.set_options(
        DisplayOptions {
            log_scale: true,
            normalize: false,
        },
        t1,
    );
    settle(&mut manager, &table, &mut renderer, t1);
    assert_eq!(renderer.calls, 4);
    assert!(manager
        .sheets()
        .iter()
        .all(|(_, s)| s.contains("log=true")));

    // Setting the same options again does nothing.
    manager.set_options(manager.options(), t1);
    assert!(!manager.is_busy());
}

#[test]
fn test_sheets_ordered_by_group_id() {
    let table = table();
    let mut renderer = Recorder::default();
    let mut manager = PreviewManager::default();
    manager.set_selected(["tnfa", "ctrl", "lif"], Instant::now());
    manager.rebuild_now(&table, &mut renderer);
    let titles: Vec<String> = manager.sheets().into_iter().map(|(_, s)| s.clone()).collect();
    assert!(titles[0].starts_with("ctrl (ID: 1) rows=2"));
    assert!(titles[1].starts_with("lif (ID: 2) rows=2"));
    assert!(titles[2].starts_with("tnfa (ID: 3) rows=1"));
}
