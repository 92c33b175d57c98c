//! Cogent stimulus log conversion.
//!
//! This crate provides tools for:
//! - Parsing Cogent stimulus-presentation logs into stimulus sequences with
//!   paired keypress responses
//! - Writing those sequences as tab-separated events tables
//! - Splitting events tables into per-condition three-column onset files
//!
//! # Example
//!
//! ```no_run
//! use cogent_events::core::loaders::load_cogent;
//! use cogent_events::core::writers::{write_events_table, Target};
//! use std::path::Path;
//!
//! let stimuli = load_cogent("oneback_1.log").unwrap();
//! let out = Path::new("sub-01_task-onebacktask_run-01_events.tsv");
//! write_events_table(Target::Path(out), &stimuli, 0.35).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use crate::config::{ConvertConfig, OnsetsConfig, PipelineConfig, TableConfig};
pub use crate::core::loaders::{Response, Stimulus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
