#![allow(clippy::uninlined_format_args)]
use std::collections::HashSet;
use std::path::PathBuf;

use figsheet_core::{
    GroupRule, Grouping, GroupingConfig, Table, ALL_KEY, UNGROUPED_KEY,
};

fn sample_files() -> Vec<PathBuf> {
    [
        "Ctrl_A_00h_01.tif",
        "Ctrl_A_02h_01.tif",
        "Ctrl_B_00h_01.tif",
        "TNFa_A_24h.tif",
        "LIF.tif",
        "odd__name.png",
        "_leading.tif",
        "x_y_z_w.jpg",
    ]
    .iter()
    .map(|n| PathBuf::from("/data/run").join(n))
    .collect()
}

fn rules() -> Vec<GroupRule> {
    let mut rules = Vec::new();
    for start in 0..5 {
        for end in 0..6 {
            rules.push(GroupRule::Underscore { start, end });
            rules.push(GroupRule::Characters { start, end });
        }
    }
    rules
}

#[test]
fn test_buckets_partition_input() {
    let files = sample_files();
    for rule in rules() {
        let grouping = Grouping::build(&files, &GroupingConfig::with_rule(rule));
        let mut seen = HashSet::new();
        for bucket in grouping.groups().values() {
            for path in bucket {
                assert!(seen.insert(path.clone()), "{:?} duplicated by {:?}", path, rule);
            }
        }
        let input: HashSet<PathBuf> = files.iter().cloned().collect();
        assert_eq!(seen, input, "rule {:?} lost files", rule);
        assert_eq!(grouping.total_files(), files.len());
    }
}

#[test]
fn test_underscore_keys_equal_joined_segments() {
    let files = sample_files();
    for start in 0..5 {
        for end in (start + 1)..6 {
            let rule = GroupRule::Underscore { start, end };
            let grouping = Grouping::build(&files, &GroupingConfig::with_rule(rule));
            for (key, bucket) in grouping.groups() {
                if key == UNGROUPED_KEY {
                    continue;
                }
                for path in bucket {
                    let stem = path.file_stem().unwrap().to_str().unwrap();
                    let parts: Vec<&str> = stem.split('_').collect();
                    assert!(end <= parts.len());
                    assert_eq!(key, &parts[start..end].join("_"));
                }
            }
        }
    }
}

#[test]
fn test_disabled_grouping_yields_single_all_group() {
    let files = sample_files();
    let grouping = Grouping::build(&files, &GroupingConfig::default());
    assert_eq!(grouping.groups().keys().collect::<Vec<_>>(), vec![ALL_KEY]);
    let table = Table::from_grouping(&grouping).unwrap();
    assert_eq!(table.len(), files.len());
    assert!(table.groups().is_empty());
}

#[test]
fn test_table_ids_follow_sorted_group_names() {
    let files = sample_files();
    let rule = GroupRule::Underscore { start: 0, end: 1 };
    let table = Table::from_grouping(&Grouping::build(&files, &GroupingConfig::with_rule(rule)))
        .unwrap();
    let groups = table.groups();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    let ids: Vec<u32> = groups.iter().map(|g| g.id).collect();
    assert_eq!(ids, (1..=u32::try_from(ids.len()).unwrap()).collect::<Vec<_>>());
}
