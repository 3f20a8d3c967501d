//! Scan step: static security scan via bandit.
//!
//! Parallel-eligible: reads sources, writes nothing. Bandit has no native
//! preview flag, so dry-run mode skips the step entirely.

use std::time::Instant;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, skip_missing_tool, step_result_from, StepContext, StepResult};

pub const NAME: &str = "scan";
const TOOL: &str = "bandit";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("SCAN: security scan (via bandit)");

    let config = ctx.config;
    if !config.security_scan {
        return Ok(StepResult::skipped(NAME, "security scan disabled"));
    }
    if config.dry_run {
        return Ok(StepResult::skipped(NAME, "no native preview flag"));
    }
    if !tool_exists(TOOL) {
        return Ok(skip_missing_tool(NAME, TOOL));
    }

    let mut args = vec!["-r".to_string(), ".".to_string(), "-q".to_string()];
    if !config.exclude_patterns.is_empty() {
        args.extend(["-x".to_string(), config.exclude_patterns.join(",")]);
    }

    let spec = CommandSpec::new(TOOL, args, &config.project_root)
        .timeout_secs(ctx.timeout(NAME, DEFAULT_TIMEOUT));

    let started = Instant::now();
    let outcome = run_tool("Security scan", &spec)?;
    Ok(step_result_from(NAME, started, outcome))
}
