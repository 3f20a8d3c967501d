//! CLI argument definitions.
//!
//! All arguments are defined with clap's derive macros on the single
//! [`Cli`] entry point; several default from environment variables so the
//! tool can be driven by cron the same way it is driven interactively.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{
    default_dump_cmd, default_exclude_patterns, default_workers, parse_step_timeout,
    resolve_script, WorkflowConfig,
};
use crate::error::Result;

/// Routinely - repository hygiene task runner.
#[derive(Debug, Parser)]
#[command(name = "routinely")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root all steps run against
    #[arg(long, env = "PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    /// Run only these steps, in order (comma-separated names or aliases)
    #[arg(long, value_delimiter = ',', value_name = "STEP")]
    pub steps: Vec<String>,

    /// Execute for real (the default is a dry-run preview)
    #[arg(long)]
    pub apply: bool,

    /// Auto-confirm: skip the local prompt, pass -y to tools that take it
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Lock directory guarding against concurrent runs
    #[arg(long, env = "LOCK_DIR", value_name = "DIR")]
    pub lock_dir: Option<PathBuf>,

    /// Seconds before an unreleased lock is considered abandoned (0 = never)
    #[arg(long, env = "LOCK_TTL", default_value_t = 3600, value_name = "SECS")]
    pub lock_ttl: u64,

    /// Worker count for parallel-eligible steps
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Overall workflow timeout in seconds (0 = disabled)
    #[arg(long, env = "WORKFLOW_TIMEOUT", default_value_t = 0, value_name = "SECS")]
    pub workflow_timeout: u64,

    /// Per-step timeout override (repeatable)
    #[arg(long = "step-timeout", value_name = "STEP=SECS")]
    pub step_timeouts: Vec<String>,

    /// Treat a backup failure as fatal to the remaining workflow
    #[arg(long, env = "FAIL_ON_BACKUP")]
    pub fail_on_backup: bool,

    /// Disable the security scan step
    #[arg(long)]
    pub no_security_scan: bool,

    /// Disable the dependency audit step
    #[arg(long)]
    pub no_dependency_audit: bool,

    /// Fail the test step below this coverage percentage (0 = coverage off)
    #[arg(long, env = "COV_FAIL_UNDER", default_value_t = 0, value_name = "PCT")]
    pub cov_fail_under: u32,

    /// Override exclusion patterns for file discovery (comma-separated)
    #[arg(long = "exclude", value_delimiter = ',', value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,

    /// Cache-cleaning helper script
    #[arg(long, env = "CLEAN_SCRIPT", default_value = "tools/clean.py")]
    pub clean_script: PathBuf,

    /// Backup helper script
    #[arg(long, env = "BACKUP_SCRIPT", default_value = "tools/create_backup.py")]
    pub backup_script: PathBuf,

    /// Override the dump command (program followed by its base arguments)
    #[arg(long = "dump-cmd", num_args = 1.., value_name = "ARG", allow_hyphen_values = true)]
    pub dump_cmd: Vec<String>,

    /// Write logs to this file in addition to the console
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// List registered steps and their aliases, then exit
    #[arg(long)]
    pub list_steps: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Freeze the parsed arguments into the run's immutable configuration.
    pub fn into_config(self) -> Result<WorkflowConfig> {
        let project_root = self
            .project_root
            .canonicalize()
            .unwrap_or(self.project_root);

        let mut step_timeouts = std::collections::HashMap::new();
        for raw in &self.step_timeouts {
            let (step, secs) = parse_step_timeout(raw)?;
            step_timeouts.insert(step, secs);
        }

        let clean_script = resolve_script(&project_root, self.clean_script);
        let backup_script = resolve_script(&project_root, self.backup_script);

        Ok(WorkflowConfig {
            project_root,
            dry_run: !self.apply,
            assume_yes: self.yes,
            lock_dir: self
                .lock_dir
                .unwrap_or_else(|| std::env::temp_dir().join("routinely.lock")),
            lock_ttl_secs: self.lock_ttl,
            workflow_timeout_secs: self.workflow_timeout,
            step_timeouts,
            max_workers: self.workers.unwrap_or_else(default_workers).max(1),
            steps: self.steps,
            fail_on_backup: self.fail_on_backup,
            security_scan: !self.no_security_scan,
            dependency_audit: !self.no_dependency_audit,
            cov_fail_under: self.cov_fail_under,
            exclude_patterns: if self.exclude_patterns.is_empty() {
                default_exclude_patterns()
            } else {
                self.exclude_patterns
            },
            clean_script,
            backup_script,
            dump_cmd: if self.dump_cmd.is_empty() {
                default_dump_cmd()
            } else {
                self.dump_cmd
            },
        })
    }
}
