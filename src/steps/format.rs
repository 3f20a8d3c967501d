//! Format step: lint fixes and reformatting via ruff.
//!
//! Two invocations: `ruff check` (import/lint fixes) then `ruff format`.
//! In dry-run mode both use the tool's native preview forms; a preview
//! that merely reports pending changes (ruff exit code 1) is not a step
//! failure, while a tool abort (exit code 2) is.

use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{
    banner, run_tool, skip_missing_tool, StepContext, StepResult, ToolOutcome,
};

pub const NAME: &str = "format";
const TOOL: &str = "ruff";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("FORMAT: reformat code (via ruff)");

    let config = ctx.config;
    if !tool_exists(TOOL) {
        return Ok(skip_missing_tool(NAME, TOOL));
    }

    let timeout = ctx.timeout(NAME, DEFAULT_TIMEOUT);
    let excludes = config.exclude_patterns.join(",");
    let started = Instant::now();

    let mut check_args = vec!["check".to_string(), ".".to_string()];
    if config.dry_run {
        // Preview: list violations without editing or failing the run.
        check_args.push("--exit-zero".to_string());
    } else {
        check_args.push("--fix".to_string());
    }
    if !excludes.is_empty() {
        check_args.extend(["--exclude".to_string(), excludes.clone()]);
    }

    let check = CommandSpec::new(TOOL, check_args, &config.project_root).timeout_secs(timeout);
    if let Some(result) = classify(NAME, started, run_tool("ruff check", &check)?, config.dry_run)
    {
        return Ok(result);
    }

    let mut format_args = vec!["format".to_string()];
    if config.dry_run {
        format_args.push("--check".to_string());
    }
    format_args.push(".".to_string());
    if !excludes.is_empty() {
        format_args.extend(["--exclude".to_string(), excludes]);
    }

    let format = CommandSpec::new(TOOL, format_args, &config.project_root).timeout_secs(timeout);
    if let Some(result) = classify(NAME, started, run_tool("ruff format", &format)?, config.dry_run)
    {
        return Ok(result);
    }

    Ok(StepResult::succeeded(NAME, started.elapsed()))
}

/// Returns a terminal result for failures; `None` means "keep going".
fn classify(
    step: &'static str,
    started: Instant,
    outcome: ToolOutcome,
    dry_run: bool,
) -> Option<StepResult> {
    match outcome {
        ToolOutcome::Success(_) => None,
        // ruff exits 1 when a preview found pending changes; only a real
        // abort (2) fails the step in dry-run mode.
        ToolOutcome::Failed(result) if dry_run && result.exit_code() == Some(1) => {
            info!("Preview found pending changes");
            None
        }
        ToolOutcome::Failed(result) => Some(StepResult::failed(
            step,
            started.elapsed(),
            format!("exit code {:?}", result.exit_code()),
        )),
        ToolOutcome::TimedOut { limit_secs } => {
            Some(StepResult::timed_out(step, started.elapsed(), limit_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{ExecResult, ExecStatus};
    use std::time::Duration;

    fn exec_result(code: i32) -> ExecResult {
        ExecResult {
            status: ExecStatus::Exited(Some(code)),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn preview_findings_do_not_fail_the_step() {
        let outcome = ToolOutcome::Failed(exec_result(1));
        assert!(classify(NAME, Instant::now(), outcome, true).is_none());
    }

    #[test]
    fn preview_abort_fails_the_step() {
        let outcome = ToolOutcome::Failed(exec_result(2));
        let result = classify(NAME, Instant::now(), outcome, true).unwrap();
        assert!(result.status.is_failure());
    }

    #[test]
    fn apply_mode_fails_on_any_nonzero_exit() {
        let outcome = ToolOutcome::Failed(exec_result(1));
        let result = classify(NAME, Instant::now(), outcome, false).unwrap();
        assert!(result.status.is_failure());
    }

    #[test]
    fn timeout_maps_to_timed_out() {
        let outcome = ToolOutcome::TimedOut { limit_secs: 9 };
        let result = classify(NAME, Instant::now(), outcome, false).unwrap();
        assert_eq!(result.status, crate::steps::StepStatus::TimedOut);
    }
}
