//! End-to-end tests over a fixture Cogent log and its expected events table.

use std::fs;
use std::path::Path;

use cogent_events::config::OnsetsConfig;
use cogent_events::core::loaders::{load_cogent, load_events_table, parse_cogent, Response};
use cogent_events::core::writers::{write_events_table, Target};
use cogent_events::processors::onsets::write_all_tasks;
use tempfile::TempDir;

const LOG: &str = include_str!("fixtures/oneback_1.log");
const EVENTS: &str = include_str!("fixtures/sub-01_task-onebacktask_run-01_events.tsv");
const EVENTS_NAME: &str = "sub-01_task-onebacktask_run-01_events.tsv";

#[test]
fn test_parse_then_write_matches_fixture_table() {
    let stimuli = parse_cogent(LOG).unwrap();

    let mut out: Vec<u8> = Vec::new();
    write_events_table(Target::from(&mut out), &stimuli, 0.35).unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), EVENTS);
}

#[test]
fn test_fixture_log_invariants() {
    let stimuli = parse_cogent(LOG).unwrap();
    assert_eq!(stimuli.len(), 24);

    for pair in stimuli.windows(2) {
        assert!(pair[0].onset <= pair[1].onset);
    }
    for stimulus in &stimuli {
        assert!(stimulus.onset >= 0.0);
        if let Response::Key { latency_ms, .. } = stimulus.response {
            assert!(latency_ms >= 0);
        }
    }

    // The key pressed during the second rest period is not attributed
    let last_object = &stimuli[11];
    assert_eq!(last_object.name, "shoe");
    assert_eq!(last_object.response, Response::NoResponse);
}

#[test]
fn test_write_to_path_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("oneback_1.log");
    fs::write(&log_path, LOG).unwrap();

    let tsv_path = temp_dir.path().join("sub-01").join("func").join(EVENTS_NAME);
    let stimuli = load_cogent(&log_path).unwrap();
    write_events_table(Target::Path(&tsv_path), &stimuli, 0.35).unwrap();

    assert_eq!(fs::read_to_string(&tsv_path).unwrap(), EVENTS);
}

#[test]
fn test_fixture_table_to_onset_files() {
    let data_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let func_dir = data_dir.path().join("sub-01").join("func");
    fs::create_dir_all(&func_dir).unwrap();
    fs::write(func_dir.join(EVENTS_NAME), EVENTS).unwrap();

    let written = write_all_tasks(
        data_dir.path(),
        Some(out_dir.path()),
        &["onebacktask".to_string()],
        &OnsetsConfig::default(),
    )
    .unwrap();
    assert_eq!(written.len(), 4);

    let rows = load_events_table(func_dir.join(EVENTS_NAME)).unwrap();
    let total: usize = written
        .iter()
        .map(|path| fs::read_to_string(path).unwrap().lines().count())
        .sum();
    assert_eq!(total, rows.len());

    // Code 2 rows are labelled "Objects" in the table but are consonant strings
    let consonant = read_onsets(
        &out_dir
            .path()
            .join("sub-01_task-onebacktask_run-01_label-consonant.txt"),
    );
    assert_eq!(consonant.len(), 6);
    assert_eq!(consonant[0], "15.200000\t0.350000\t1.000000");

    let objects = read_onsets(
        &out_dir
            .path()
            .join("sub-01_task-onebacktask_run-01_label-objects.txt"),
    );
    assert_eq!(objects[0], "30.400000\t0.350000\t1.000000");
}

fn read_onsets(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
