//! Test step: run the project's pytest suite.
//!
//! Fatal by default: a red test suite halts the remaining workflow. In
//! dry-run mode the suite is collected but not executed (`--collect-only`,
//! pytest's native preview), and the collected count is surfaced in the log.

use std::time::Instant;

use regex::Regex;
use tracing::info;

use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, skip_missing_tool, step_result_from, StepContext, StepResult, ToolOutcome};

pub const NAME: &str = "test";
const TOOL: &str = "pytest";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("TEST: run pytest suite");

    let config = ctx.config;
    if !tool_exists(TOOL) {
        return Ok(skip_missing_tool(NAME, TOOL));
    }

    let spec = CommandSpec::new(TOOL, suite_args(config), &config.project_root)
        .timeout_secs(ctx.timeout(NAME, DEFAULT_TIMEOUT));

    let started = Instant::now();
    let outcome = run_tool("pytest suite", &spec)?;

    if let ToolOutcome::Success(result) = &outcome {
        if config.dry_run {
            let count = collected_count(&result.stdout)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            info!("Test suite preview: {} tests discovered", count);
        } else if config.cov_fail_under > 0 {
            info!("Tests passed (coverage >= {}%)", config.cov_fail_under);
        }
    }

    Ok(step_result_from(NAME, started, outcome))
}

/// pytest argument list for the configured run mode.
fn suite_args(config: &WorkflowConfig) -> Vec<String> {
    let mut args = vec![".".to_string(), "-q".to_string()];
    if config.cov_fail_under > 0 {
        args.extend([
            "--cov=src".to_string(),
            "--cov-report=term-missing".to_string(),
            "--cov-fail-under".to_string(),
            config.cov_fail_under.to_string(),
        ]);
    }
    if config.dry_run {
        args.push("--collect-only".to_string());
    } else if config.max_workers > 1 {
        // pytest-xdist fan-out for real runs only.
        args.extend(["-n".to_string(), config.max_workers.to_string()]);
    }
    args
}

/// Extract the collected-test count from pytest's collection summary.
fn collected_count(stdout: &str) -> Option<u64> {
    let re = Regex::new(r"(\d+)\s+tests?\s+collected").expect("static regex");
    re.captures(stdout)?.get(1)?.as_str().parse().ok()
}
