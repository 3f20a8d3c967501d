//! Step registry: identifiers, aliases, and per-step metadata.
//!
//! The step set is a closed enum ([`StepId`]) enumerated at compile time;
//! the registry built from it maps identifiers and aliases to descriptors
//! once at startup and is never mutated afterwards.

use crate::config::WorkflowConfig;
use crate::error::{Result, RoutineError};
use crate::steps::{self, StepContext, StepResult};

/// Closed set of built-in steps, in natural execution order
/// (cleanup before backup before dump before commit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Prune,
    Format,
    Test,
    Clean,
    Scan,
    Audit,
    Backup,
    Dump,
    Commit,
}

impl StepId {
    /// Every step in natural order.
    pub fn all() -> [StepId; 9] {
        [
            StepId::Prune,
            StepId::Format,
            StepId::Test,
            StepId::Clean,
            StepId::Scan,
            StepId::Audit,
            StepId::Backup,
            StepId::Dump,
            StepId::Commit,
        ]
    }

    /// Canonical identifier.
    pub fn name(self) -> &'static str {
        match self {
            StepId::Prune => steps::prune::NAME,
            StepId::Format => steps::format::NAME,
            StepId::Test => steps::testsuite::NAME,
            StepId::Clean => steps::clean::NAME,
            StepId::Scan => steps::scan::NAME,
            StepId::Audit => steps::audit::NAME,
            StepId::Backup => steps::backup::NAME,
            StepId::Dump => steps::dump::NAME,
            StepId::Commit => steps::commit::NAME,
        }
    }

    /// Accepted aliases (the historical step numbers stay valid).
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            StepId::Prune => &["prune-dumps", "step1"],
            StepId::Format => &["fmt", "reformat", "step2"],
            StepId::Test => &["tests", "pytest", "step2.5"],
            StepId::Clean => &["caches", "step3"],
            StepId::Scan => &["security", "bandit"],
            StepId::Audit => &["deps", "pip-audit"],
            StepId::Backup => &["step4"],
            StepId::Dump => &["dumps", "step5"],
            StepId::Commit => &["git", "step6"],
        }
    }
}

/// The executable capability behind a step.
pub type StepFn = fn(&StepContext) -> Result<StepResult>;

/// Immutable metadata for one registered step.
#[derive(Debug, Clone, Copy)]
pub struct StepDescriptor {
    pub id: StepId,
    /// Failure halts the remaining workflow.
    pub fatal: bool,
    /// Safe to run concurrently with other parallel-eligible steps.
    pub parallel: bool,
    pub run: StepFn,
}

impl StepDescriptor {
    pub fn name(&self) -> &'static str {
        self.id.name()
    }
}

/// Registry of all built-in steps, constructed once at startup.
#[derive(Debug)]
pub struct Registry {
    descriptors: Vec<StepDescriptor>,
}

impl Registry {
    /// Build the registry. `--fail-on-backup` promotes the backup step to
    /// fatal; everything else carries its fixed metadata.
    pub fn builtin(config: &WorkflowConfig) -> Self {
        let descriptors = StepId::all()
            .into_iter()
            .map(|id| StepDescriptor {
                id,
                fatal: match id {
                    StepId::Test | StepId::Commit => true,
                    StepId::Backup => config.fail_on_backup,
                    _ => false,
                },
                parallel: matches!(id, StepId::Scan | StepId::Audit),
                run: match id {
                    StepId::Prune => steps::prune::run,
                    StepId::Format => steps::format::run,
                    StepId::Test => steps::testsuite::run,
                    StepId::Clean => steps::clean::run,
                    StepId::Scan => steps::scan::run,
                    StepId::Audit => steps::audit::run,
                    StepId::Backup => steps::backup::run,
                    StepId::Dump => steps::dump::run,
                    StepId::Commit => steps::commit::run,
                },
            })
            .collect();
        Self { descriptors }
    }

    /// All registered descriptors in natural order.
    pub fn all(&self) -> &[StepDescriptor] {
        &self.descriptors
    }

    /// Resolve requested identifiers/aliases, preserving the caller's order.
    ///
    /// An empty request resolves to every step in natural order. Unknown
    /// tokens fail before any step executes, naming the invalid token.
    pub fn resolve(&self, tokens: &[String]) -> Result<Vec<&StepDescriptor>> {
        if tokens.is_empty() {
            return Ok(self.descriptors.iter().collect());
        }

        tokens
            .iter()
            .map(|token| {
                let wanted = token.trim();
                self.descriptors
                    .iter()
                    .find(|d| {
                        d.name().eq_ignore_ascii_case(wanted)
                            || d.id.aliases().iter().any(|a| a.eq_ignore_ascii_case(wanted))
                    })
                    .ok_or_else(|| RoutineError::UnknownStep {
                        token: wanted.to_string(),
                    })
            })
            .collect()
    }
}
