//! Audit step: dependency vulnerability audit via pip-audit.
//!
//! Parallel-eligible: inspects the environment's installed packages and
//! writes nothing. pip-audit has a native `--dry-run`, so the preview mode
//! passes the flag through instead of skipping.

use std::time::Instant;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, skip_missing_tool, step_result_from, StepContext, StepResult};

pub const NAME: &str = "audit";
const TOOL: &str = "pip-audit";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("AUDIT: dependency audit (via pip-audit)");

    let config = ctx.config;
    if !config.dependency_audit {
        return Ok(StepResult::skipped(NAME, "dependency audit disabled"));
    }
    if !tool_exists(TOOL) {
        return Ok(skip_missing_tool(NAME, TOOL));
    }

    let mut args: Vec<String> = Vec::new();
    if config.dry_run {
        args.push("--dry-run".to_string());
    }

    let spec = CommandSpec::new(TOOL, args, &config.project_root)
        .timeout_secs(ctx.timeout(NAME, DEFAULT_TIMEOUT));

    let started = Instant::now();
    let outcome = run_tool("Dependency audit", &spec)?;
    Ok(step_result_from(NAME, started, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::steps::StepStatus;

    #[test]
    fn skips_when_feature_disabled() {
        let config = WorkflowConfig {
            dependency_audit: false,
            ..WorkflowConfig::default()
        };
        let result = run(&StepContext::new(&config)).unwrap();

        assert_eq!(result.status, StepStatus::Skipped);
        assert!(result.detail.as_deref().unwrap().contains("disabled"));
    }
}
