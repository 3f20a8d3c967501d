//! Clean step: purge caches via the external clean helper script.

use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, skip_missing_tool, step_result_from, StepContext, StepResult};

pub const NAME: &str = "clean";
const INTERPRETER: &str = "python3";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("CLEAN: purge caches (via clean script)");

    let config = ctx.config;
    if !config.clean_script.exists() {
        info!("Clean script missing — skip: {}", config.clean_script.display());
        return Ok(StepResult::skipped(
            NAME,
            format!("script not found: {}", config.clean_script.display()),
        ));
    }
    if !tool_exists(INTERPRETER) {
        return Ok(skip_missing_tool(NAME, INTERPRETER));
    }

    let mut args = vec![
        config.clean_script.display().to_string(),
        config.project_root.display().to_string(),
        "--allow-root".to_string(),
    ];
    if config.dry_run {
        args.push("--preview".to_string());
    }
    if config.assume_yes {
        args.push("-y".to_string());
    }

    let spec = CommandSpec::new(INTERPRETER, args, &config.project_root)
        .timeout_secs(ctx.timeout(NAME, DEFAULT_TIMEOUT));

    let started = Instant::now();
    let outcome = run_tool("Clean caches", &spec)?;
    Ok(step_result_from(NAME, started, outcome))
}
