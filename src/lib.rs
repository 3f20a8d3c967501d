//! Routinely - repository hygiene task runner.
//!
//! Routinely sequences calls to external hygiene tools (formatter, test
//! runner, security scanner, backup/dump utilities, git) under a single
//! cross-process lock, with per-command and workflow-level timeouts and
//! partial-failure handling.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Immutable per-run configuration
//! - [`error`] - Error types and result aliases
//! - [`lock`] - Cross-process lock directory with TTL eviction
//! - [`runner`] - Step orchestration, timeouts, and reporting
//! - [`shell`] - Subprocess execution and tool discovery
//! - [`steps`] - Built-in hygiene steps and the step registry
//!
//! # Example
//!
//! ```no_run
//! use routinely::config::WorkflowConfig;
//! use routinely::runner::WorkflowRunner;
//!
//! let config = WorkflowConfig::default(); // dry-run on by default
//! let report = WorkflowRunner::new(&config).run()?;
//! std::process::exit(report.exit_code() as i32);
//! # Ok::<(), routinely::RoutineError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod runner;
pub mod shell;
pub mod steps;

pub use error::{Result, RoutineError};
