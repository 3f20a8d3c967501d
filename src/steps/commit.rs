//! Commit step: record the hygiene snapshot in git.
//!
//! `git add` / `git commit` / `git push` in sequence. A commit that reports
//! "nothing to commit" is not a failure; the push still runs so the remote
//! stays consistent. Git has no native preview for this sequence, so
//! dry-run mode skips the step.

use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, StepContext, StepResult, ToolOutcome};

pub const NAME: &str = "commit";
const TOOL: &str = "git";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("COMMIT: hygiene snapshot to git");

    let config = ctx.config;
    if config.dry_run {
        return Ok(StepResult::skipped(NAME, "no native preview for git commit"));
    }
    if !tool_exists(TOOL) {
        info!("git not found — skipping commit");
        return Ok(StepResult::skipped(NAME, "git not found"));
    }

    let timeout = ctx.timeout(NAME, DEFAULT_TIMEOUT);
    let cwd = &config.project_root;
    let started = Instant::now();

    let add = CommandSpec::new(TOOL, ["add", "."], cwd).timeout_secs(timeout);
    match run_tool("git add", &add)? {
        ToolOutcome::Success(_) => {}
        outcome => return Ok(terminal(started, outcome)),
    }

    let message = format!(
        "routine hygiene: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let commit =
        CommandSpec::new(TOOL, ["commit", "-m", message.as_str()], cwd).timeout_secs(timeout);
    let committed = match run_tool("git commit", &commit)? {
        ToolOutcome::Success(_) => true,
        // Non-zero exit usually means a clean tree; push regardless.
        ToolOutcome::Failed(_) => {
            info!("No changes to commit; snapshot up-to-date");
            false
        }
        outcome @ ToolOutcome::TimedOut { .. } => return Ok(terminal(started, outcome)),
    };

    let push = CommandSpec::new(TOOL, ["push", "-u", "origin", "main"], cwd).timeout_secs(timeout);
    match run_tool("git push", &push)? {
        ToolOutcome::Success(_) => {}
        outcome => return Ok(terminal(started, outcome)),
    }

    if committed {
        info!("Hygiene snapshot committed & pushed: {}", message);
    }
    Ok(StepResult::succeeded(NAME, started.elapsed()))
}

fn terminal(started: Instant, outcome: ToolOutcome) -> StepResult {
    crate::steps::step_result_from(NAME, started, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::steps::StepStatus;

    #[test]
    fn dry_run_skips_without_native_flag() {
        let config = WorkflowConfig::default(); // dry_run defaults on
        let result = run(&StepContext::new(&config)).unwrap();

        assert_eq!(result.status, StepStatus::Skipped);
        assert!(result.detail.as_deref().unwrap().contains("preview"));
    }
}
