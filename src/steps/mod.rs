//! Built-in hygiene steps and the shared tool-invocation helper.
//!
//! Each step is a plain function `fn(&StepContext) -> StepResult` registered
//! in [`registry::Registry`]. Steps own their tool's flag grammar; the shared
//! [`run_tool`] helper owns logging, timeout classification, and output relay.

pub mod audit;
pub mod backup;
pub mod clean;
pub mod commit;
pub mod dump;
pub mod format;
pub mod prune;
pub mod registry;
pub mod result;
pub mod scan;
pub mod testsuite;

pub use registry::{Registry, StepDescriptor, StepId};
pub use result::{format_duration, StepResult, StepStatus};

use std::time::Instant;

use tracing::{info, warn};

use crate::config::WorkflowConfig;
use crate::shell::{self, CommandSpec};

/// Read-only context handed to every step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a WorkflowConfig,
    /// Workflow-level deadline; per-command timeouts never reach past it.
    deadline: Option<Instant>,
}

impl<'a> StepContext<'a> {
    pub fn new(config: &'a WorkflowConfig) -> Self {
        Self {
            config,
            deadline: None,
        }
    }

    pub fn with_deadline(config: &'a WorkflowConfig, deadline: Option<Instant>) -> Self {
        Self { config, deadline }
    }

    /// Effective timeout for a step's command: the configured per-step value,
    /// capped at the time remaining before the workflow deadline.
    pub fn timeout(&self, step: &str, default_secs: u64) -> u64 {
        let base = self.config.step_timeout(step, default_secs);
        match self.deadline {
            Some(deadline) => {
                let remaining = deadline
                    .saturating_duration_since(Instant::now())
                    .as_secs()
                    .max(1);
                base.min(remaining)
            }
            None => base,
        }
    }
}

/// What happened when a single tool invocation ran.
#[derive(Debug)]
pub enum ToolOutcome {
    Success(shell::ExecResult),
    Failed(shell::ExecResult),
    TimedOut { limit_secs: u64 },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }
}

/// Run one tool invocation, relaying its output through the logger.
///
/// Stdout lines log at info, stderr lines at warn, matching how the
/// surrounding banners read in the log stream.
pub fn run_tool(description: &str, spec: &CommandSpec) -> crate::error::Result<ToolOutcome> {
    info!(">>> {}: {}", description, spec.display());

    let result = shell::run(spec)?;

    for line in result.stdout.lines() {
        info!("  {}", line);
    }
    for line in result.stderr.lines() {
        warn!("  {}", line);
    }

    if result.timed_out() {
        let limit_secs = spec.timeout.unwrap_or(0);
        warn!("✖ {} timed out after {}s", description, limit_secs);
        return Ok(ToolOutcome::TimedOut { limit_secs });
    }

    if result.success() {
        info!("✓ {} (code 0)", description);
        Ok(ToolOutcome::Success(result))
    } else {
        warn!("✖ {} (code {:?})", description, result.exit_code());
        Ok(ToolOutcome::Failed(result))
    }
}

/// Convert a single-invocation outcome into a step result.
pub fn step_result_from(step: &'static str, started: Instant, outcome: ToolOutcome) -> StepResult {
    match outcome {
        ToolOutcome::Success(_) => StepResult::succeeded(step, started.elapsed()),
        ToolOutcome::Failed(result) => StepResult::failed(
            step,
            started.elapsed(),
            format!("exit code {:?}", result.exit_code()),
        ),
        ToolOutcome::TimedOut { limit_secs } => {
            StepResult::timed_out(step, started.elapsed(), limit_secs)
        }
    }
}

/// Skip with a missing-tool warning, after a failed existence probe.
pub fn skip_missing_tool(step: &'static str, tool: &str) -> StepResult {
    warn!("{} not found — skipping {}", tool, step);
    StepResult::skipped(step, format!("{} not found", tool))
}

/// Log the banner that opens each step section.
pub fn banner(title: &str) {
    info!("{}", "=".repeat(60));
    info!("{}", title);
    info!("{}", "=".repeat(60));
}
