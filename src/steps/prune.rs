//! Prune step: delete stale code dumps via the dump tool's batch clean mode.

use std::time::Instant;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, skip_missing_tool, step_result_from, StepContext, StepResult};

pub const NAME: &str = "prune";
const TOOL: &str = "code-dump";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("PRUNE: delete old code dumps");

    let config = ctx.config;
    if !tool_exists(TOOL) {
        return Ok(skip_missing_tool(NAME, TOOL));
    }

    let mut args = vec!["batch".to_string(), "clean".to_string()];
    if config.dry_run {
        args.push("-d".to_string());
    }
    if config.assume_yes {
        args.push("-y".to_string());
    }

    let spec = CommandSpec::new(TOOL, args, &config.project_root)
        .timeout_secs(ctx.timeout(NAME, DEFAULT_TIMEOUT));

    let started = Instant::now();
    let outcome = run_tool("Prune old dumps", &spec)?;
    Ok(step_result_from(NAME, started, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::steps::StepStatus;

    #[test]
    fn skips_when_tool_missing() {
        // `code-dump` is not installed in the test environment.
        let config = WorkflowConfig::default();
        let ctx = StepContext::new(&config);

        let result = run(&ctx).unwrap();
        assert_eq!(result.status, StepStatus::Skipped);
        assert!(result.detail.as_deref().unwrap().contains(TOOL));
    }
}
