//! Three-column onset files from events tables.
//!
//! Each registered task lists the conditions to extract and, optionally, a
//! preprocessor that relabels table rows before they are split by condition.
//! For every condition with at least one event a file
//! `sub-NN_task-<task>[_run-NN]_label-<condition>.txt` is written holding
//! onset, duration and amplitude columns.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use thiserror::Error;

use super::naming::EventsName;
use crate::config::OnsetsConfig;
use crate::core::conditions::{Condition, Lookup};
use crate::core::loaders::{load_events_table, EventRow};
use crate::core::writers::write_three_column;

/// Errors that can occur while extracting onsets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OnsetsError {
    #[error("One or more task names without processors: {0}")]
    UnknownTasks(String),

    #[error("No events tables matching {pattern}")]
    NoTables { pattern: String },

    #[error("row {row}: no stimulus code column")]
    MissingCode { row: usize },

    #[error("row {row}: no condition for stimulus code {code}")]
    UnknownCode { row: usize, code: u32 },
}

/// Events table row after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEvent {
    pub trial_type: String,
    pub onset: f64,
    pub duration: f64,
    pub amplitude: f64,
}

/// Relabels the rows of a table for a task.
pub type Preprocessor =
    fn(&TaskDef, &[EventRow], f64) -> std::result::Result<Vec<ClassifiedEvent>, OnsetsError>;

/// How to extract conditions for one task.
pub struct TaskDef {
    pub name: &'static str,
    /// Condition labels to extract, in output order.
    pub conditions: &'static [&'static str],
    /// Code table used by the preprocessor.
    pub lookup: Lookup,
    /// When `None`, rows are classified by their own `trial_type` column.
    pub preprocessor: Option<Preprocessor>,
}

const ONEBACK_CONDITIONS: [&str; 4] = [
    Condition::Words.label(),
    Condition::Objects.label(),
    Condition::ScrambledObjects.label(),
    Condition::ConsonantStrings.label(),
];

/// Registered tasks.
pub static TASK_DEFS: [TaskDef; 1] = [TaskDef {
    name: "onebacktask",
    conditions: &ONEBACK_CONDITIONS,
    lookup: Lookup::Corrected,
    preprocessor: Some(oneback_preprocessor),
}];

/// Look up a registered task by name.
pub fn find_task(name: &str) -> Option<&'static TaskDef> {
    TASK_DEFS.iter().find(|def| def.name == name)
}

/// Names of all registered tasks.
pub fn task_names() -> Vec<&'static str> {
    TASK_DEFS.iter().map(|def| def.name).collect()
}

/// Classify one-back rows from their stimulus code.
///
/// The `trial_type` column of one-back tables was written with the legacy
/// code table, so it is ignored here and the label is taken from the code
/// through the task's lookup instead.
pub fn oneback_preprocessor(
    def: &TaskDef,
    rows: &[EventRow],
    amplitude: f64,
) -> std::result::Result<Vec<ClassifiedEvent>, OnsetsError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let code = row.code.ok_or(OnsetsError::MissingCode { row: i + 1 })?;
            let condition = def
                .lookup
                .condition(code)
                .ok_or(OnsetsError::UnknownCode { row: i + 1, code })?;
            Ok(ClassifiedEvent {
                trial_type: condition.label().to_string(),
                onset: row.onset,
                duration: row.duration,
                amplitude,
            })
        })
        .collect()
}

fn classify_by_trial_type(rows: &[EventRow], amplitude: f64) -> Vec<ClassifiedEvent> {
    rows.iter()
        .map(|row| ClassifiedEvent {
            trial_type: row.trial_type.clone(),
            onset: row.onset,
            duration: row.duration,
            amplitude,
        })
        .collect()
}

/// Onset / duration / amplitude rows of the events labelled `name`.
pub fn three_column(events: &[ClassifiedEvent], name: &str) -> Vec<[f64; 3]> {
    events
        .iter()
        .filter(|event| event.trial_type == name)
        .map(|event| [event.onset, event.duration, event.amplitude])
        .collect()
}

/// Split table rows into per-condition three-column rows, in the task's
/// condition order. Conditions without events are kept, with no rows.
///
/// # Errors
///
/// Returns an error if the task's preprocessor rejects a row.
pub fn reshape(
    def: &TaskDef,
    rows: &[EventRow],
    amplitude: f64,
) -> std::result::Result<Vec<(&'static str, Vec<[f64; 3]>)>, OnsetsError> {
    let events = match def.preprocessor {
        Some(preprocess) => preprocess(def, rows, amplitude)?,
        None => classify_by_trial_type(rows, amplitude),
    };

    Ok(def
        .conditions
        .iter()
        .map(|&name| (name, three_column(&events, name)))
        .collect())
}

/// Read an events table and split it by condition.
///
/// Returns an empty list for tables whose task has no registered definition.
///
/// # Errors
///
/// Returns an error if the file name is outside the naming grammar, or the
/// table cannot be read or classified.
pub fn tsv_to_events(
    tsv_path: &Path,
    config: &OnsetsConfig,
) -> Result<Vec<(&'static str, Vec<[f64; 3]>)>> {
    let name = EventsName::from_path(tsv_path)?;
    let Some(def) = find_task(&name.task) else {
        debug!("No task definition for {}, skipping", tsv_path.display());
        return Ok(Vec::new());
    };

    let rows = load_events_table(tsv_path)
        .with_context(|| format!("Failed to read events table: {}", tsv_path.display()))?;

    reshape(def, &rows, config.amplitude)
        .with_context(|| format!("Failed to classify events in {}", tsv_path.display()))
}

/// Write three-column files for one events table.
///
/// # Arguments
///
/// * `tsv_path` - Events table
/// * `out_dir` - Output directory; defaults to the table's directory
/// * `config` - Onsets configuration
///
/// # Returns
///
/// Paths of the files written. Empty conditions produce no file.
pub fn write_task(
    tsv_path: &Path,
    out_dir: Option<&Path>,
    config: &OnsetsConfig,
) -> Result<Vec<PathBuf>> {
    let name = EventsName::from_path(tsv_path)?;
    let events = tsv_to_events(tsv_path, config)?;

    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| tsv_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let mut written = Vec::new();
    for (label, rows) in events {
        if rows.is_empty() {
            debug!("No '{}' events in {}", label, tsv_path.display());
            continue;
        }

        let out_path = dir.join(name.label_file_name(label));
        println!("Writing from {} to {}", tsv_path.display(), out_path.display());
        write_three_column(&out_path, &rows)?;
        written.push(out_path);
    }

    info!("{}: wrote {} label files", name, written.len());
    Ok(written)
}

/// Find events tables at `<data_dir>/sub-*/<func_dir>/sub*.tsv`, sorted.
///
/// Subject directories without a `func_dir` are skipped.
///
/// # Errors
///
/// Returns an error if `data_dir` or any directory entry below it cannot be read.
pub fn find_event_tables(data_dir: &Path, func_dir: &str) -> Result<Vec<PathBuf>> {
    let mut subject_dirs = Vec::new();
    for entry in fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory: {}", data_dir.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", data_dir.display()))?
            .path();
        if path.is_dir() && file_name_matches(&path, |name| name.starts_with("sub-")) {
            subject_dirs.push(path);
        }
    }

    subject_dirs.sort();

    let mut tables = Vec::new();
    for subject_dir in subject_dirs {
        let dir = subject_dir.join(func_dir);
        if !dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let path = entry
                .with_context(|| format!("Failed to read entry in {}", dir.display()))?
                .path();
            if path.is_file()
                && file_name_matches(&path, |name| name.starts_with("sub") && name.ends_with("tsv"))
            {
                tables.push(path);
            }
        }
    }

    tables.sort();
    Ok(tables)
}

fn file_name_matches(path: &Path, predicate: impl Fn(&str) -> bool) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(predicate)
}

/// Write three-column files for every events table under `data_dir`.
///
/// # Arguments
///
/// * `data_dir` - Directory containing `sub-*` subject directories
/// * `out_dir` - Output directory; defaults to each table's directory
/// * `tasks` - Task names to process; empty means every registered task
/// * `config` - Onsets configuration
///
/// # Returns
///
/// Paths of all files written.
///
/// # Errors
///
/// Fails on the first unknown task name, when no table is found, or when
/// any table cannot be processed.
pub fn write_all_tasks(
    data_dir: &Path,
    out_dir: Option<&Path>,
    tasks: &[String],
    config: &OnsetsConfig,
) -> Result<Vec<PathBuf>> {
    let selected: Vec<&str> = if tasks.is_empty() {
        task_names()
    } else {
        tasks.iter().map(String::as_str).collect()
    };

    let unknown: Vec<&str> = selected
        .iter()
        .copied()
        .filter(|task| find_task(task).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(OnsetsError::UnknownTasks(unknown.join(", ")).into());
    }

    let tables = find_event_tables(data_dir, &config.func_dir)?;
    if tables.is_empty() {
        return Err(OnsetsError::NoTables {
            pattern: data_dir
                .join("sub-*")
                .join(&config.func_dir)
                .join("sub*tsv")
                .display()
                .to_string(),
        }
        .into());
    }

    let mut written = Vec::new();
    for tsv_path in tables {
        let name = EventsName::from_path(&tsv_path)?;
        if selected.contains(&name.task.as_str()) {
            written.extend(write_task(&tsv_path, out_dir, config)?);
        }
    }

    Ok(written)
}
