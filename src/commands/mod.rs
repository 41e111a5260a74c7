//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod collect;
pub mod paths;
pub mod run;
pub mod visualize;

// Re-export main command functions
pub use collect::{execute_collect, validate_collect_args, CollectArgs};
pub use paths::{execute_paths, resolve_paths};
pub use run::{execute_run, RunArgs};
pub use visualize::{default_output, execute_visualize, validate_visualize_args, VisualizeArgs};
