//! Dump step: regenerate code dumps via the dump tool's batch run mode.
//!
//! The tool's `run` subcommand previews by default; `-nd` forces a real run,
//! so it is appended only when the workflow itself is applying changes.

use std::time::Instant;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, skip_missing_tool, step_result_from, StepContext, StepResult};

pub const NAME: &str = "dump";
const DEFAULT_TIMEOUT: u64 = 600;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("DUMP: generate code dumps (via dump tool)");

    let config = ctx.config;
    let Some((program, base_args)) = config.dump_cmd.split_first() else {
        return Ok(StepResult::skipped(NAME, "no dump command configured"));
    };
    if !tool_exists(program) {
        return Ok(skip_missing_tool(NAME, program));
    }

    let mut args: Vec<String> = base_args.to_vec();
    if !config.dry_run {
        args.push("-nd".to_string());
    }
    if config.assume_yes {
        args.push("-y".to_string());
    }

    let spec = CommandSpec::new(program.clone(), args, &config.project_root)
        .timeout_secs(ctx.timeout(NAME, DEFAULT_TIMEOUT));

    let started = Instant::now();
    let outcome = run_tool("Batch generate code dumps", &spec)?;
    Ok(step_result_from(NAME, started, outcome))
}
