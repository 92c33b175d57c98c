//! Core data types and I/O operations.

pub mod conditions;
pub mod loaders;
pub mod writers;

pub use conditions::{Condition, Lookup, CORRECTED_LOOKUP, LEGACY_LOOKUP};
pub use loaders::{
    load_cogent, load_events_table, parse_cogent, EventRow, LoaderError, LogError, Response,
    Stimulus,
};
pub use writers::{write_events_table, write_three_column, Target, WriteError};
