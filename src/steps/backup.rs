//! Backup step: snapshot the project via the external backup helper script.
//!
//! Non-fatal by default; `--fail-on-backup` promotes the step to fatal so a
//! failed snapshot halts the remaining workflow before dumps and commits.

use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::shell::{tool_exists, CommandSpec};
use crate::steps::{banner, run_tool, skip_missing_tool, step_result_from, StepContext, StepResult};

pub const NAME: &str = "backup";
const INTERPRETER: &str = "python3";
const DEFAULT_TIMEOUT: u64 = 300;

pub fn run(ctx: &StepContext) -> Result<StepResult> {
    banner("BACKUP: snapshot project (via backup script)");

    let config = ctx.config;
    if !config.backup_script.exists() {
        info!(
            "Backup script missing — skip: {}",
            config.backup_script.display()
        );
        return Ok(StepResult::skipped(
            NAME,
            format!("script not found: {}", config.backup_script.display()),
        ));
    }
    if !tool_exists(INTERPRETER) {
        return Ok(skip_missing_tool(NAME, INTERPRETER));
    }

    let mut args = vec![
        config.backup_script.display().to_string(),
        config.project_root.display().to_string(),
    ];
    if config.dry_run {
        args.push("--dry-run".to_string());
    }
    if config.assume_yes {
        args.push("-y".to_string());
    }

    let spec = CommandSpec::new(INTERPRETER, args, &config.project_root)
        .timeout_secs(ctx.timeout(NAME, DEFAULT_TIMEOUT));

    let started = Instant::now();
    let outcome = run_tool("Backup project", &spec)?;
    Ok(step_result_from(NAME, started, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::steps::StepStatus;
    use std::path::PathBuf;

    #[test]
    fn skips_when_script_missing() {
        let config = WorkflowConfig {
            backup_script: PathBuf::from("/definitely/not/here/create_backup.py"),
            ..WorkflowConfig::default()
        };
        let result = run(&StepContext::new(&config)).unwrap();

        assert_eq!(result.status, StepStatus::Skipped);
    }
}
