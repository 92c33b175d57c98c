//! Data loaders for Cogent logs and events tables.
//!
//! This module provides parsers for:
//! - Cogent stimulus logs (tab-delimited, one timing line per event)
//! - Events tables previously written by [`crate::core::writers`]
//!
//! A Cogent log looks like this (fields are tab separated):
//!
//! ```text
//! COGENT LOG FILE
//! 0       [0]     :       COGENT START
//! 12      [1]     :       Start of experiment: 12
//! 1013    [2]     :       Stim:   1       word_house
//! 1720    [3]     :       Key     28      DOWN    at      1712
//! 1801    [4]     :       Key     28      UP      at      1795
//! 3900    [5]     :       Rest at: 3900
//! 7000    [6]     :       COGENT STOP
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use csv::ReaderBuilder;
use log::debug;
use regex::Regex;
use thiserror::Error;

/// Every event line starts with a millisecond timestamp and a bracketed counter.
static TIMING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\t\[\d+\]").expect("timing pattern is a valid regex"));

const START_SENTINEL: &str = "COGENT START";
const STOP_SENTINEL: &str = "COGENT STOP";
const EXPERIMENT_START_SENTINEL: &str = "Start of experiment: ";
const REST_SENTINEL: &str = "Rest at:";
const KEY_SENTINEL: &str = "Key";
const STIM_SENTINEL: &str = "Stim:";

/// Written in both response columns when no key was pressed for a stimulus.
pub const NO_RESPONSE: &str = "NR";

/// Errors that make a Cogent log unusable. Any of them aborts the whole file.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LogError {
    #[error("no timing lines found")]
    NoTimingLines,

    #[error("line {line}: expected 'COGENT START' marker")]
    MissingStartMarker { line: usize },

    #[error("line {line}: expected 'Start of experiment' marker")]
    MissingExperimentStart { line: usize },

    #[error("declared start time {declared} does not match recorded time {recorded}")]
    StartTimeMismatch { declared: i64, recorded: i64 },

    #[error("last line is not a 'COGENT STOP' marker")]
    MissingStopMarker,

    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid Cogent log {path}: {source}")]
    InvalidLog {
        path: PathBuf,
        #[source]
        source: LogError,
    },

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Keypress paired with a stimulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// No key went down between this stimulus and the next stimulus or rest.
    NoResponse,
    /// Key name and reaction time in raw log units (milliseconds).
    Key { key: String, latency_ms: i64 },
}

impl Response {
    /// Value for the response key column.
    pub fn key_field(&self) -> &str {
        match self {
            Response::NoResponse => NO_RESPONSE,
            Response::Key { key, .. } => key,
        }
    }

    /// Value for the response latency column.
    pub fn latency_field(&self) -> String {
        match self {
            Response::NoResponse => NO_RESPONSE.to_string(),
            Response::Key { latency_ms, .. } => latency_ms.to_string(),
        }
    }
}

/// One stimulus presentation recovered from a Cogent log.
#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    /// Seconds since the reference time, rounded to a tenth of a second.
    pub onset: f64,
    /// Stimulus type code as logged.
    pub code: u32,
    /// Stimulus name as logged.
    pub name: String,
    pub response: Response,
}

/// Classified timing line.
#[derive(Debug, PartialEq, Eq)]
enum LogLine<'a> {
    Rest,
    KeyUp,
    KeyDown { key: &'a str, time: i64 },
    Stim { time: i64, code: u32, name: &'a str },
}

fn last_field<'a>(fields: &[&'a str]) -> &'a str {
    fields.last().copied().unwrap_or_default()
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    line: usize,
) -> std::result::Result<T, LogError> {
    let raw = fields.get(index).copied().unwrap_or_default();
    raw.trim().parse().map_err(|_| LogError::MalformedLine {
        line,
        reason: format!("field {index} is not an integer: '{raw}'"),
    })
}

/// Parse a raw millisecond timestamp. Only unsigned decimal digits are accepted.
fn parse_timestamp(raw: &str, line: usize) -> std::result::Result<i64, LogError> {
    let raw = raw.trim();
    let malformed = || LogError::MalformedLine {
        line,
        reason: format!("not a timestamp: '{raw}'"),
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    raw.parse().map_err(|_| malformed())
}

fn timestamp_field(
    fields: &[&str],
    index: usize,
    line: usize,
) -> std::result::Result<i64, LogError> {
    parse_timestamp(fields.get(index).copied().unwrap_or_default(), line)
}

fn require_fields(
    fields: &[&str],
    count: usize,
    kind: &str,
    line: usize,
) -> std::result::Result<(), LogError> {
    if fields.len() < count {
        return Err(LogError::MalformedLine {
            line,
            reason: format!(
                "{kind} line has {} fields, expected at least {count}",
                fields.len()
            ),
        });
    }
    Ok(())
}

/// Classify one line of the event section. `line` is 1-based, for messages.
fn classify_line(text: &str, line: usize) -> std::result::Result<LogLine<'_>, LogError> {
    if !TIMING_PATTERN.is_match(text) {
        return Err(LogError::MalformedLine {
            line,
            reason: "missing timestamp and counter".to_string(),
        });
    }

    let fields: Vec<&str> = text.split('\t').collect();
    if fields.get(2) != Some(&":") {
        return Err(LogError::MalformedLine {
            line,
            reason: "third field is not ':'".to_string(),
        });
    }

    if last_field(&fields).starts_with(REST_SENTINEL) {
        require_fields(&fields, 4, "rest", line)?;
        return Ok(LogLine::Rest);
    }

    match fields.get(3).copied() {
        Some(KEY_SENTINEL) => {
            require_fields(&fields, 8, "key", line)?;
            if fields[5] == "UP" {
                return Ok(LogLine::KeyUp);
            }
            if fields[5..7] != ["DOWN", "at"] {
                return Err(LogError::MalformedLine {
                    line,
                    reason: format!("unexpected key event '{} {}'", fields[5], fields[6]),
                });
            }
            Ok(LogLine::KeyDown {
                key: fields[4],
                time: timestamp_field(&fields, 7, line)?,
            })
        }
        Some(STIM_SENTINEL) => {
            require_fields(&fields, 6, "stimulus", line)?;
            Ok(LogLine::Stim {
                time: timestamp_field(&fields, 0, line)?,
                code: parse_field(&fields, 4, line)?,
                name: fields[5],
            })
        }
        other => Err(LogError::MalformedLine {
            line,
            reason: format!("unknown event '{}'", other.unwrap_or_default()),
        }),
    }
}

/// Seconds from `reference_ms` to `raw_ms`, rounded to one decimal place.
///
/// Rounding goes through the decimal formatter, so the result is the nearest
/// tenth to the binary value of the quotient, with exact ties going to even
/// (1.25 -> 1.2, 1.35 -> 1.4).
fn experiment_time(raw_ms: i64, reference_ms: i64) -> f64 {
    let seconds = (raw_ms - reference_ms) as f64 / 1000.0;
    format!("{seconds:.1}").parse().unwrap_or(seconds)
}

/// Parse the text of a Cogent log into its stimulus sequence.
///
/// The log is scanned from the first timing line, which must be the
/// `COGENT START` marker and be followed by the `Start of experiment` marker.
/// The last line must be `COGENT STOP`. Onsets are measured from the
/// timestamp of the line after the experiment start marker. The declared
/// start time is only sanity-checked against its own line's timestamp; it
/// does not line up with the event timestamps.
///
/// A key-down is paired with the latest stimulus as long as neither a rest
/// marker nor an earlier key-down came in between; other key events are
/// ignored.
///
/// # Errors
///
/// Returns [`LogError`] on the first structural problem. No partial result
/// is produced.
pub fn parse_cogent(content: &str) -> std::result::Result<Vec<Stimulus>, LogError> {
    let lines: Vec<&str> = content.lines().collect();

    let start = lines
        .iter()
        .position(|line| TIMING_PATTERN.is_match(line))
        .ok_or(LogError::NoTimingLines)?;

    let start_fields: Vec<&str> = lines[start].split('\t').collect();
    if last_field(&start_fields).trim() != START_SENTINEL {
        return Err(LogError::MissingStartMarker { line: start + 1 });
    }

    let experiment_line = start + 1;
    let experiment_fields: Vec<&str> = lines
        .get(experiment_line)
        .map(|line| line.split('\t').collect())
        .unwrap_or_default();
    let declared = last_field(&experiment_fields)
        .trim()
        .strip_prefix(EXPERIMENT_START_SENTINEL)
        .ok_or(LogError::MissingExperimentStart {
            line: experiment_line + 1,
        })?;
    let declared = parse_timestamp(declared, experiment_line + 1)?;
    let recorded = timestamp_field(&experiment_fields, 0, experiment_line + 1)?;
    if recorded.abs_diff(declared) > 1 {
        return Err(LogError::StartTimeMismatch { declared, recorded });
    }

    let stop_fields: Vec<&str> = lines
        .last()
        .map(|line| line.split('\t').collect())
        .unwrap_or_default();
    if lines.len() <= experiment_line + 1 || last_field(&stop_fields).trim() != STOP_SENTINEL {
        return Err(LogError::MissingStopMarker);
    }

    let reference_line = experiment_line + 1;
    let reference_fields: Vec<&str> = lines[reference_line].split('\t').collect();
    let reference = timestamp_field(&reference_fields, 0, reference_line + 1)?;

    let body = lines.get(reference_line..lines.len() - 1).unwrap_or_default();

    let mut stimuli: Vec<Stimulus> = Vec::new();
    // Raw timestamp of the stimulus still waiting for a key-down.
    let mut pending: Option<i64> = None;

    for (offset, text) in body.iter().enumerate() {
        let line = reference_line + offset + 1;
        match classify_line(text, line)? {
            LogLine::Rest => {
                debug!("line {line}: rest, waiting for the next stimulus");
                pending = None;
            }
            LogLine::KeyUp => debug!("line {line}: ignoring key-up"),
            LogLine::KeyDown { key, time } => match (pending.take(), stimuli.last_mut()) {
                (Some(anchor), Some(stimulus)) => {
                    stimulus.response = Response::Key {
                        key: key.to_string(),
                        latency_ms: time - anchor,
                    };
                }
                _ => debug!("line {line}: ignoring key {key} with no pending stimulus"),
            },
            LogLine::Stim { time, code, name } => {
                stimuli.push(Stimulus {
                    onset: experiment_time(time, reference),
                    code,
                    name: name.to_string(),
                    response: Response::NoResponse,
                });
                pending = Some(time);
            }
        }
    }

    debug!("parsed {} stimuli", stimuli.len());
    Ok(stimuli)
}

/// Load and parse a Cogent log file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid Cogent log.
pub fn load_cogent<P: AsRef<Path>>(path: P) -> Result<Vec<Stimulus>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_cogent(&content).map_err(|source| LoaderError::InvalidLog {
        path: path.to_path_buf(),
        source,
    })
}

/// One row of an events table as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub onset: f64,
    pub duration: f64,
    pub trial_type: String,
    /// Stimulus type code (column `1`), when the table carries one.
    pub code: Option<u32>,
}

/// Load an events table (tab-separated, header row).
///
/// The `onset`, `duration` and `trial_type` columns are required; the
/// stimulus code column `1` is read when present.
///
/// # Errors
///
/// Returns an error if the file cannot be read, lacks required columns, or
/// holds a non-numeric value in a numeric column.
pub fn load_events_table<P: AsRef<Path>>(path: P) -> Result<Vec<EventRow>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let col_map: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let missing: Vec<&str> = ["onset", "duration", "trial_type"]
        .into_iter()
        .filter(|name| !col_map.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns(format!(
            "{} in {}",
            missing.join(", "),
            path.display()
        )));
    }

    let onset_idx = col_map["onset"];
    let duration_idx = col_map["duration"];
    let trial_type_idx = col_map["trial_type"];
    let code_idx = col_map.get("1").copied();

    let parse_number = |value: Option<&str>, column: &str, row: usize| -> Result<f64> {
        let value = value.unwrap_or_default();
        value.trim().parse().map_err(|_| {
            LoaderError::ParseError(format!(
                "{}: row {row}: {column} '{value}' is not a number",
                path.display()
            ))
        })
    };

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 1;

        let code = match code_idx.and_then(|idx| record.get(idx)) {
            Some(value) => Some(value.trim().parse::<u32>().map_err(|_| {
                LoaderError::ParseError(format!(
                    "{}: row {row}: code '{value}' is not an integer",
                    path.display()
                ))
            })?),
            None => None,
        };

        rows.push(EventRow {
            onset: parse_number(record.get(onset_idx), "onset", row)?,
            duration: parse_number(record.get(duration_idx), "duration", row)?,
            trial_type: record.get(trial_type_idx).unwrap_or_default().to_string(),
            code,
        });
    }

    Ok(rows)
}
