//! Configuration types for the Cogent events pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for events tables written from Cogent logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Duration written to every row, in seconds
    #[serde(default = "default_duration")]
    pub duration: f64,
}

fn default_duration() -> f64 {
    0.35
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
        }
    }
}

/// Configuration for three-column onset extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnsetsConfig {
    /// Amplitude column of every three-column row
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Per-subject subdirectory holding the events tables
    #[serde(default = "default_func_dir")]
    pub func_dir: String,
}

fn default_amplitude() -> f64 {
    1.0
}

fn default_func_dir() -> String {
    "func".to_string()
}

impl Default for OnsetsConfig {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            func_dir: default_func_dir(),
        }
    }
}

/// Configuration for converting a tree of Cogent logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Task name used in generated table file names
    #[serde(default = "default_task_name")]
    pub task_name: String,

    /// Log file stem; logs are named `<stem>_<run>.log`
    #[serde(default = "default_log_stem")]
    pub log_stem: String,
}

fn default_task_name() -> String {
    "onebacktask".to_string()
}

fn default_log_stem() -> String {
    "oneback".to_string()
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            task_name: default_task_name(),
            log_stem: default_log_stem(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub onsets: OnsetsConfig,

    #[serde(default)]
    pub convert: ConvertConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
