//! Collect phase: run a program under instrumentation and gather its logs.
//!
//! This module handles:
//! - Injecting the instrumentation hook through `NODE_OPTIONS`
//! - Forwarding Ctrl+C to the traced child
//! - Classifying how the child ended
//! - Moving the runtime's trace log into the run directory

pub mod interrupt;
pub mod paths;
pub mod relocate;
pub mod supervisor;

// Re-export main types
pub use interrupt::{InterruptRelay, RelayGuard};
pub use paths::{LogKind, LoggingPaths, RunIdentifier};
pub use supervisor::{
    classify, collect, node_options, CollectOptions, Collection, Platform, ProcessResult,
    Termination,
};
