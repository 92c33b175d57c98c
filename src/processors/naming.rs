//! File naming for events tables and three-column label files.
//!
//! Events tables are named `sub-<NN>_task-<name>[_run-<NN>]_events.tsv` and
//! the label files derived from them
//! `sub-<NN>_task-<name>[_run-<NN>]_label-<condition>.txt`.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static EVENTS_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sub-(\d+)_task-([^_]+)(?:_run-(\d+))?_events\.tsv$")
        .expect("events name pattern is a valid regex")
});

/// Errors raised for file names outside the naming grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("not an events table name: '{0}'")]
    InvalidEventsName(String),
}

/// Subject, task and optional run encoded in an events table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsName {
    pub subject: u32,
    pub task: String,
    /// 1-based run number, `None` when the task had a single run.
    pub run: Option<u32>,
}

impl EventsName {
    pub fn new(subject: u32, task: impl Into<String>, run: Option<u32>) -> Self {
        Self {
            subject,
            task: task.into(),
            run,
        }
    }

    /// Parse the file name part of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::InvalidEventsName`] when the name does not follow
    /// `sub-<N>_task-<name>[_run-<N>]_events.tsv`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, NameError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let invalid = || NameError::InvalidEventsName(path.display().to_string());

        let captures = EVENTS_NAME_PATTERN.captures(file_name).ok_or_else(invalid)?;
        let subject = captures[1].parse().map_err(|_| invalid())?;
        let run = match captures.get(3) {
            Some(run) => Some(run.as_str().parse().map_err(|_| invalid())?),
            None => None,
        };

        Ok(Self {
            subject,
            task: captures[2].to_string(),
            run,
        })
    }

    /// Name prefix shared by the table and its label files.
    fn stem(&self) -> String {
        match self.run {
            Some(run) => format!("sub-{:02}_task-{}_run-{:02}", self.subject, self.task, run),
            None => format!("sub-{:02}_task-{}", self.subject, self.task),
        }
    }

    /// Events table file name.
    pub fn events_file_name(&self) -> String {
        format!("{}_events.tsv", self.stem())
    }

    /// Three-column file name for one condition label.
    pub fn label_file_name(&self, label: &str) -> String {
        format!("{}_label-{}.txt", self.stem(), label)
    }

    /// Subject directory name, e.g. `sub-07`.
    pub fn subject_dir(&self) -> String {
        format!("sub-{:02}", self.subject)
    }
}

impl fmt::Display for EventsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Parse an events table name into (subject, task, run).
///
/// # Errors
///
/// Returns [`NameError`] when the name does not follow the grammar.
pub fn parse_events_name<P: AsRef<Path>>(
    path: P,
) -> Result<(u32, String, Option<u32>), NameError> {
    let name = EventsName::from_path(path)?;
    Ok((name.subject, name.task, name.run))
}
