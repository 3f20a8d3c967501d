//! Workflow configuration.
//!
//! [`WorkflowConfig`] is built once from CLI arguments at startup and passed
//! by reference into every component. Nothing mutates it after a run starts;
//! no component reads process-wide implicit state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread;

use crate::error::{Result, RoutineError};

/// Patterns excluded from file discovery (forwarded to the formatter).
pub fn default_exclude_patterns() -> Vec<String> {
    [
        ".git",
        ".venv",
        "venv",
        "__pycache__",
        ".mypy_cache",
        ".pytest_cache",
        ".ruff_cache",
        "node_modules",
        "build",
        "dist",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default worker count for parallel-eligible steps.
pub fn default_workers() -> usize {
    let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    cpus.min(8)
}

/// Immutable configuration for one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Project root all steps run against.
    pub project_root: PathBuf,

    /// Preview mode: tools with a native preview flag still run, the rest no-op.
    pub dry_run: bool,

    /// Auto-confirm: skip the local prompt and pass `-y` to tools that take it.
    pub assume_yes: bool,

    /// Lock directory (created exclusively, holds the owner PID file).
    pub lock_dir: PathBuf,

    /// Seconds after which an unreleased lock is considered abandoned (0 = never).
    pub lock_ttl_secs: u64,

    /// Overall workflow deadline in seconds (0 = disabled).
    pub workflow_timeout_secs: u64,

    /// Per-step timeout overrides, keyed by canonical step name.
    pub step_timeouts: HashMap<String, u64>,

    /// Worker pool size for parallel-eligible steps.
    pub max_workers: usize,

    /// Requested step names/aliases in order; empty = all steps.
    pub steps: Vec<String>,

    /// Treat a backup failure as fatal to the remaining workflow.
    pub fail_on_backup: bool,

    /// Feature toggle: run the security scanner step.
    pub security_scan: bool,

    /// Feature toggle: run the dependency audit step.
    pub dependency_audit: bool,

    /// Minimum test coverage percentage enforced by the test step
    /// (0 = coverage reporting off).
    pub cov_fail_under: u32,

    /// Patterns excluded from file discovery.
    pub exclude_patterns: Vec<String>,

    /// Cache-cleaning helper script invoked by the clean step.
    pub clean_script: PathBuf,

    /// Backup helper script invoked by the backup step.
    pub backup_script: PathBuf,

    /// Base dump command (program + leading args); dynamic flags are appended.
    pub dump_cmd: Vec<String>,
}

impl WorkflowConfig {
    /// Effective timeout for a step, honoring CLI overrides.
    pub fn step_timeout(&self, step: &str, default_secs: u64) -> u64 {
        self.step_timeouts.get(step).copied().unwrap_or(default_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            dry_run: true,
            assume_yes: false,
            lock_dir: std::env::temp_dir().join("routinely.lock"),
            lock_ttl_secs: 0,
            workflow_timeout_secs: 0,
            step_timeouts: HashMap::new(),
            max_workers: default_workers(),
            steps: Vec::new(),
            fail_on_backup: false,
            security_scan: true,
            dependency_audit: true,
            cov_fail_under: 0,
            exclude_patterns: default_exclude_patterns(),
            clean_script: PathBuf::from("tools/clean.py"),
            backup_script: PathBuf::from("tools/create_backup.py"),
            dump_cmd: default_dump_cmd(),
        }
    }
}

/// Anchor a helper-script path to the project root.
///
/// Relative script paths are meant relative to the project being cleaned,
/// not the directory the orchestrator happens to be invoked from; the child
/// also runs with `cwd = project_root`, so both the existence check and the
/// launched argument must agree on the same resolution.
pub fn resolve_script(project_root: &Path, script: PathBuf) -> PathBuf {
    if script.is_absolute() {
        script
    } else {
        project_root.join(script)
    }
}

/// Default base command for the dump step.
pub fn default_dump_cmd() -> Vec<String> {
    ["code-dump", "batch", "run", "--dirs", "."]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Parse a `step=secs` timeout override pair.
pub fn parse_step_timeout(raw: &str) -> Result<(String, u64)> {
    let (step, secs) = raw.split_once('=').ok_or_else(|| {
        RoutineError::Other(anyhow::anyhow!(
            "invalid --step-timeout '{raw}': expected STEP=SECONDS"
        ))
    })?;
    let secs: u64 = secs.trim().parse().map_err(|_| {
        RoutineError::Other(anyhow::anyhow!(
            "invalid --step-timeout '{raw}': '{secs}' is not a number of seconds"
        ))
    })?;
    Ok((step.trim().to_string(), secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workers_capped_at_eight() {
        assert!(default_workers() >= 1);
        assert!(default_workers() <= 8);
    }

    #[test]
    fn step_timeout_falls_back_to_default() {
        let config = WorkflowConfig::default();
        assert_eq!(config.step_timeout("dump", 600), 600);
    }

    #[test]
    fn step_timeout_honors_override() {
        let mut config = WorkflowConfig::default();
        config.step_timeouts.insert("dump".to_string(), 30);
        assert_eq!(config.step_timeout("dump", 600), 30);
    }

    #[test]
    fn parse_step_timeout_accepts_pair() {
        let (step, secs) = parse_step_timeout("test=120").unwrap();
        assert_eq!(step, "test");
        assert_eq!(secs, 120);
    }

    #[test]
    fn parse_step_timeout_trims_whitespace() {
        let (step, secs) = parse_step_timeout(" clean = 45 ").unwrap();
        assert_eq!(step, "clean");
        assert_eq!(secs, 45);
    }

    #[test]
    fn parse_step_timeout_rejects_missing_equals() {
        assert!(parse_step_timeout("test120").is_err());
    }

    #[test]
    fn parse_step_timeout_rejects_non_numeric() {
        assert!(parse_step_timeout("test=soon").is_err());
    }

    #[test]
    fn dry_run_defaults_on() {
        assert!(WorkflowConfig::default().dry_run);
    }

    #[test]
    fn relative_script_resolves_under_project_root() {
        let resolved = resolve_script(Path::new("/srv/project"), PathBuf::from("tools/clean.py"));
        assert_eq!(resolved, PathBuf::from("/srv/project/tools/clean.py"));
    }

    #[test]
    fn absolute_script_is_taken_as_is() {
        let resolved = resolve_script(Path::new("/srv/project"), PathBuf::from("/opt/clean.py"));
        assert_eq!(resolved, PathBuf::from("/opt/clean.py"));
    }

    #[test]
    fn default_excludes_cover_common_caches() {
        let patterns = default_exclude_patterns();
        assert!(patterns.iter().any(|p| p == "__pycache__"));
        assert!(patterns.iter().any(|p| p == ".git"));
    }
}
