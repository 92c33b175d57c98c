//! Cogent log to events table conversion.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use regex::Regex;
use thiserror::Error;

use super::naming::EventsName;
use crate::config::PipelineConfig;
use crate::core::loaders::load_cogent;
use crate::core::writers::{write_events_table, Target};

/// Errors that can occur while converting a tree of logs.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("No Cogent logs found in {folder}")]
    NoLogsFound { folder: PathBuf },
}

/// Convert a single Cogent log to an events table.
///
/// The log is parsed completely before the table is created, so a log that
/// fails to parse leaves no output behind.
///
/// # Arguments
///
/// * `log_path` - Cogent log file
/// * `tsv_path` - Events table to write (parent directories are created)
/// * `duration` - Duration written to every row, in seconds
///
/// # Returns
///
/// The number of stimuli written.
pub fn convert_log(log_path: &Path, tsv_path: &Path, duration: f64) -> Result<usize> {
    let stimuli = load_cogent(log_path)
        .with_context(|| format!("Failed to load Cogent log: {}", log_path.display()))?;

    write_events_table(Target::Path(tsv_path), &stimuli, duration)
        .with_context(|| format!("Failed to write events table: {}", tsv_path.display()))?;

    info!(
        "{} -> {} ({} stimuli)",
        log_path.display(),
        tsv_path.display(),
        stimuli.len()
    );
    Ok(stimuli.len())
}

/// Pair every `<log_root>/sub-NN/<stem>_<run>.log` with the events table path
/// it converts to, `<table_root>/sub-NN/<func_dir>/sub-NN_task-<task>_run-RR_events.tsv`.
///
/// Directories and files that do not follow this layout are skipped.
/// Pairs are sorted by log path.
pub fn aligned_logs(
    log_root: &Path,
    table_root: &Path,
    config: &PipelineConfig,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let subject_pattern = Regex::new(r"^sub-(\d+)$")?;
    let log_pattern = Regex::new(&format!(
        r"^{}_(\d+)\.log$",
        regex::escape(&config.convert.log_stem)
    ))?;

    let mut subject_dirs = Vec::new();
    for entry in fs::read_dir(log_root)
        .with_context(|| format!("Failed to read log directory: {}", log_root.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", log_root.display()))?
            .path();
        if path.is_dir() {
            subject_dirs.push(path);
        }
    }

    subject_dirs.sort();

    let mut pairs = Vec::new();
    for subject_dir in subject_dirs {
        let dir_name = subject_dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let Some(subject) = subject_pattern
            .captures(dir_name)
            .and_then(|c| c[1].parse::<u32>().ok())
        else {
            warn!("Skipping {}: not a subject directory", subject_dir.display());
            continue;
        };

        let mut logs: Vec<(u32, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&subject_dir)
            .with_context(|| format!("Failed to read subject directory: {}", subject_dir.display()))?
        {
            let path = entry
                .with_context(|| format!("Failed to read entry in {}", subject_dir.display()))?
                .path();
            let run = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| log_pattern.captures(name))
                .and_then(|c| c[1].parse::<u32>().ok());
            if let Some(run) = run {
                logs.push((run, path));
            }
        }

        logs.sort_by(|a, b| a.1.cmp(&b.1));

        for (run, log_path) in logs {
            let name = EventsName::new(subject, config.convert.task_name.as_str(), Some(run));
            let tsv_path = table_root
                .join(name.subject_dir())
                .join(&config.onsets.func_dir)
                .join(name.events_file_name());
            pairs.push((log_path, tsv_path));
        }
    }

    Ok(pairs)
}

/// Convert every Cogent log under `log_root` into `table_root`.
///
/// Stops at the first log that fails to convert.
///
/// # Returns
///
/// Paths of the events tables written.
pub fn convert_tree(
    log_root: &Path,
    table_root: &Path,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    let pairs = aligned_logs(log_root, table_root, config)?;
    if pairs.is_empty() {
        return Err(ConvertError::NoLogsFound {
            folder: log_root.to_path_buf(),
        }
        .into());
    }

    let mut written = Vec::with_capacity(pairs.len());
    for (log_path, tsv_path) in pairs {
        convert_log(&log_path, &tsv_path, config.table.duration)?;
        written.push(tsv_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    const LOG: &str = "COGENT LOG FILE\n\
        0\t[0]\t:\tCOGENT START\n\
        3\t[1]\t:\tStart of experiment: 3\n\
        1000\t[2]\t:\tStim:\t1\tword_a\n\
        1450\t[3]\t:\tKey\t28\tDOWN\tat\t1440\n\
        3000\t[4]\t:\tStim:\t2\tobj_b\n\
        5000\t[5]\t:\tCOGENT STOP\n";

    fn create_log(dir: &Path, name: &str, content: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_convert_log() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = create_log(temp_dir.path(), "oneback_1.log", LOG);
        let tsv_path = temp_dir.path().join("out").join("events.tsv");

        let count = convert_log(&log_path, &tsv_path, 0.35).unwrap();
        assert_eq!(count, 2);

        let content = fs::read_to_string(&tsv_path).unwrap();
        assert_eq!(
            content,
            "onset\tduration\ttrial_type\t0\t1\t2\t3\n\
             0.000\t0.350\tWords\tword_a\t1\t28\t440\n\
             2.000\t0.350\tObjects\tobj_b\t2\tNR\tNR\n"
        );
    }

    #[test]
    fn test_convert_log_without_stop_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let truncated = LOG.trim_end().rsplit_once('\n').unwrap().0;
        let log_path = create_log(temp_dir.path(), "oneback_1.log", truncated);
        let tsv_path = temp_dir.path().join("events.tsv");

        let err = convert_log(&log_path, &tsv_path, 0.35).unwrap_err();
        assert!(format!("{err:#}").contains("COGENT STOP"));
        assert!(!tsv_path.exists());
    }

    #[test]
    fn test_aligned_logs() {
        let logs = TempDir::new().unwrap();
        let tables = TempDir::new().unwrap();
        create_log(&logs.path().join("sub-03"), "oneback_2.log", LOG);
        create_log(&logs.path().join("sub-03"), "oneback_1.log", LOG);
        create_log(&logs.path().join("sub-03"), "notes.txt", "ignore me");
        create_log(&logs.path().join("sub-01"), "oneback_1.log", LOG);
        create_log(&logs.path().join("scratch"), "oneback_1.log", LOG);

        let pairs = aligned_logs(logs.path(), tables.path(), &PipelineConfig::default()).unwrap();
        let outputs: Vec<PathBuf> = pairs
            .iter()
            .map(|(_, tsv)| tsv.strip_prefix(tables.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            outputs,
            vec![
                PathBuf::from("sub-01/func/sub-01_task-onebacktask_run-01_events.tsv"),
                PathBuf::from("sub-03/func/sub-03_task-onebacktask_run-01_events.tsv"),
                PathBuf::from("sub-03/func/sub-03_task-onebacktask_run-02_events.tsv"),
            ]
        );
    }

    #[test]
    fn test_convert_tree() {
        let logs = TempDir::new().unwrap();
        let tables = TempDir::new().unwrap();
        create_log(&logs.path().join("sub-43"), "oneback_1.log", LOG);
        create_log(&logs.path().join("sub-43"), "oneback_2.log", LOG);

        let written = convert_tree(logs.path(), tables.path(), &PipelineConfig::default()).unwrap();

        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_convert_tree_empty() {
        let logs = TempDir::new().unwrap();
        let tables = TempDir::new().unwrap();

        let err = convert_tree(logs.path(), tables.path(), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::NoLogsFound { .. })
        ));
    }

    #[test]
    fn test_aligned_logs_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("no-such-dir");

        let err = aligned_logs(&missing, temp_dir.path(), &PipelineConfig::default()).unwrap_err();

        assert!(format!("{err:#}").contains("Failed to read log directory"));
    }
}
