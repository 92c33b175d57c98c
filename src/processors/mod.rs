//! Data processing modules.

pub mod convert;
pub mod naming;
pub mod onsets;

// Re-export key types for convenience
pub use convert::{aligned_logs, convert_log, convert_tree, ConvertError};
pub use naming::{parse_events_name, EventsName, NameError};
pub use onsets::{
    find_event_tables, find_task, reshape, task_names, three_column, tsv_to_events,
    write_all_tasks, write_task, ClassifiedEvent, OnsetsError, TaskDef, TASK_DEFS,
};
