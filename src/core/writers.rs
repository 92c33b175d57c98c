//! Data writers for events tables and three-column onset files.
//!
//! This module provides functions for writing:
//! - Events tables (tab-separated, fixed seven-column header)
//! - Three-column onset / duration / amplitude files

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use thiserror::Error;

use super::conditions::Lookup;
use super::loaders::Stimulus;

/// Header of every events table. Columns `0`..`3` hold the stimulus name,
/// type code, response key and response latency.
pub const EVENTS_COLUMNS: [&str; 7] = ["onset", "duration", "trial_type", "0", "1", "2", "3"];

/// Label used in error messages for writes to an already-open handle.
const HANDLE_LABEL: &str = "<handle>";

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Stimulus code with no entry in the code table.
    #[error("no trial type for stimulus code {code} ('{name}')")]
    UnknownCode { code: u32, name: String },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Where a table goes: a file path (created, parents included) or a writer
/// the caller already holds open.
pub enum Target<'a> {
    Path(&'a Path),
    Handle(&'a mut dyn Write),
}

impl<'a> From<&'a Path> for Target<'a> {
    fn from(path: &'a Path) -> Self {
        Target::Path(path)
    }
}

impl<'a, W: Write> From<&'a mut W> for Target<'a> {
    fn from(handle: &'a mut W) -> Self {
        Target::Handle(handle)
    }
}

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Format one stimulus as an events table record.
fn events_record(stimulus: &Stimulus, duration: f64) -> Result<[String; 7]> {
    // Released tables carry the legacy labels; keep them byte-identical.
    let condition = Lookup::Legacy
        .condition(stimulus.code)
        .ok_or_else(|| WriteError::UnknownCode {
            code: stimulus.code,
            name: stimulus.name.clone(),
        })?;

    Ok([
        format!("{:.3}", stimulus.onset),
        format!("{:.3}", duration),
        condition.name().to_string(),
        stimulus.name.clone(),
        stimulus.code.to_string(),
        stimulus.response.key_field().to_string(),
        stimulus.response.latency_field(),
    ])
}

fn write_events_to<W: Write>(
    writer: W,
    stimuli: &[Stimulus],
    duration: f64,
    label: &str,
) -> Result<()> {
    let mut tsv_writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(writer);

    tsv_writer
        .write_record(EVENTS_COLUMNS)
        .map_err(|e| WriteError::CsvError {
            path: label.to_string(),
            source: e,
        })?;

    for stimulus in stimuli {
        tsv_writer
            .write_record(&events_record(stimulus, duration)?)
            .map_err(|e| WriteError::CsvError {
                path: label.to_string(),
                source: e,
            })?;
    }

    tsv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: label.to_string(),
        source: e,
    })
}

/// Write a stimulus sequence as an events table.
///
/// One row per stimulus: onset and `duration` to three decimals, the legacy
/// trial type label, stimulus name, type code, response key and latency
/// (`NR` for both when there was no response).
///
/// # Arguments
///
/// * `target` - File path (parent directories will be created if needed) or
///   an open writer
/// * `stimuli` - Stimulus sequence from [`crate::core::loaders::parse_cogent`]
/// * `duration` - Duration written to every row, in seconds
///
/// # Errors
///
/// Returns an error if:
/// - A stimulus code has no trial type
/// - Parent directories cannot be created
/// - The destination cannot be created or written to
///
/// # Example
///
/// ```no_run
/// use cogent_events::core::loaders::load_cogent;
/// use cogent_events::core::writers::{write_events_table, Target};
/// use std::path::Path;
///
/// let stimuli = load_cogent("oneback_1.log").unwrap();
/// let out = Path::new("sub-01_task-onebacktask_run-01_events.tsv");
/// write_events_table(Target::Path(out), &stimuli, 0.35).unwrap();
/// ```
pub fn write_events_table(target: Target<'_>, stimuli: &[Stimulus], duration: f64) -> Result<()> {
    match target {
        Target::Path(path) => {
            ensure_parent_dirs(path)?;
            let writer = create_buffered_writer(path)?;
            write_events_to(writer, stimuli, duration, &path.display().to_string())
        }
        Target::Handle(handle) => write_events_to(handle, stimuli, duration, HANDLE_LABEL),
    }
}

/// Write onset / duration / amplitude rows, tab separated, six decimals,
/// no header.
///
/// # Errors
///
/// Returns an error if parent directories or the file cannot be created, or
/// the file cannot be written to.
pub fn write_three_column(path: &Path, rows: &[[f64; 3]]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let path_str = path.display().to_string();

    for [onset, duration, amplitude] in rows {
        writeln!(writer, "{:.6}\t{:.6}\t{:.6}", onset, duration, amplitude).map_err(|e| {
            WriteError::WriteFile {
                path: path_str.clone(),
                source: e,
            }
        })?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::Response;
    use tempfile::tempdir;

    fn create_test_stimuli() -> Vec<Stimulus> {
        vec![
            Stimulus {
                onset: 0.0,
                code: 1,
                name: "word_house".to_string(),
                response: Response::Key {
                    key: "28".to_string(),
                    latency_ms: 699,
                },
            },
            Stimulus {
                onset: 2.2,
                code: 3,
                name: "scram_07".to_string(),
                response: Response::NoResponse,
            },
        ]
    }

    #[test]
    fn test_write_events_table_to_handle() {
        let mut out: Vec<u8> = Vec::new();
        write_events_table(Target::from(&mut out), &create_test_stimuli(), 0.35).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "onset\tduration\ttrial_type\t0\t1\t2\t3\n\
             0.000\t0.350\tWords\tword_house\t1\t28\t699\n\
             2.200\t0.350\tScrambled objects\tscram_07\t3\tNR\tNR\n"
        );
    }

    #[test]
    fn test_write_events_table_uses_legacy_labels() {
        let stimuli: Vec<Stimulus> = (1..=4)
            .map(|code| Stimulus {
                onset: code as f64,
                code,
                name: format!("stim_{code}"),
                response: Response::NoResponse,
            })
            .collect();

        let mut out: Vec<u8> = Vec::new();
        write_events_table(Target::from(&mut out), &stimuli, 0.35).unwrap();

        let content = String::from_utf8(out).unwrap();
        let labels: Vec<&str> = content
            .lines()
            .skip(1)
            .map(|line| line.split('\t').nth(2).unwrap())
            .collect();
        assert_eq!(
            labels,
            vec!["Words", "Objects", "Scrambled objects", "Consonant strings"]
        );
    }

    #[test]
    fn test_write_events_table_to_path_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub-01").join("func").join("events.tsv");

        write_events_table(Target::from(path.as_path()), &create_test_stimuli(), 0.35).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], EVENTS_COLUMNS.join("\t"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_events_table_unknown_code() {
        let stimuli = vec![Stimulus {
            onset: 0.0,
            code: 9,
            name: "mystery".to_string(),
            response: Response::NoResponse,
        }];

        let mut out: Vec<u8> = Vec::new();
        let result = write_events_table(Target::from(&mut out), &stimuli, 0.35);

        match result.unwrap_err() {
            WriteError::UnknownCode { code, name } => {
                assert_eq!(code, 9);
                assert_eq!(name, "mystery");
            }
            other => panic!("Expected UnknownCode error, got {other:?}"),
        }
    }

    #[test]
    fn test_write_three_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("label-words.txt");

        write_three_column(&path, &[[0.0, 0.35, 1.0], [12.3, 0.35, 1.0]]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "0.000000\t0.350000\t1.000000\n12.300000\t0.350000\t1.000000\n"
        );
    }
}
