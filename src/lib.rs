//! Async Trace Studio
//!
//! Profiling of asynchronous activity in Node.js programs.
//!
//! A profile is produced in two phases that share nothing but a log
//! directory:
//!
//! - **collect** runs the target with an instrumentation hook preloaded and
//!   gathers its system info, stack trace and trace event logs into
//!   `<pid>.async-trace/`
//! - **visualize** decodes those logs concurrently, analyzes them and
//!   streams the result into one self-contained HTML file
//!
//! ## Getting Started
//!
//! ```bash
//! async-trace run -- node app.js
//! ```
//!
//! Or, from code:
//!
//! ```ignore
//! use async_trace_studio::collect::{collect, CollectOptions, InterruptRelay};
//! use async_trace_studio::pipeline::{visualize, VisualizeOptions};
//!
//! let command = vec!["node".to_string(), "app.js".to_string()];
//! let run = collect(&command, &CollectOptions::default(), InterruptRelay::global())?;
//! visualize(&run.log_dir, "profile.html", &VisualizeOptions::default())?;
//! ```

pub mod analysis;
pub mod artifact;
pub mod collect;
pub mod commands;
pub mod decoder;
pub mod pipeline;
pub mod utils;
