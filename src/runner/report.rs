//! End-of-run aggregation and exit-code computation.

use std::time::Duration;

use tracing::{error, info};

use crate::steps::{format_duration, StepResult, StepStatus};

/// Ordered per-step outcomes for one workflow run.
#[derive(Debug)]
pub struct RunReport {
    /// Results in execution order.
    pub results: Vec<StepResult>,

    /// Total wall-clock duration.
    pub duration: Duration,

    /// The workflow-level deadline expired before all steps launched.
    pub workflow_timed_out: bool,
}

impl RunReport {
    pub fn count(&self, status: StepStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// True when no step failed or timed out and the deadline held.
    pub fn success(&self) -> bool {
        !self.workflow_timed_out && !self.results.iter().any(|r| r.status.is_failure())
    }

    /// Process exit code: 0 on success, 124 on workflow timeout, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.workflow_timed_out {
            124
        } else if self.success() {
            0
        } else {
            1
        }
    }

    /// Emit the human-readable summary through the logger.
    pub fn log_summary(&self) {
        info!("{}", "=".repeat(60));
        for result in &self.results {
            info!("{}", result.summary_line());
        }
        info!(
            "{} succeeded, {} failed, {} timed out, {} skipped in {}",
            self.count(StepStatus::Succeeded),
            self.count(StepStatus::Failed),
            self.count(StepStatus::TimedOut),
            self.count(StepStatus::Skipped),
            format_duration(self.duration),
        );
        if self.workflow_timed_out {
            error!("WORKFLOW TIMED OUT");
        } else if self.success() {
            info!("WORKFLOW SUCCESS");
        } else {
            error!("WORKFLOW FAILED");
        }
        info!("{}", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(results: Vec<StepResult>, timed_out: bool) -> RunReport {
        RunReport {
            results,
            duration: Duration::from_secs(1),
            workflow_timed_out: timed_out,
        }
    }

    #[test]
    fn all_succeeded_exits_zero() {
        let r = report(
            vec![
                StepResult::succeeded("prune", Duration::ZERO),
                StepResult::succeeded("format", Duration::ZERO),
            ],
            false,
        );
        assert!(r.success());
        assert_eq!(r.exit_code(), 0);
    }

    #[test]
    fn skips_do_not_fail_the_run() {
        let r = report(
            vec![
                StepResult::succeeded("prune", Duration::ZERO),
                StepResult::skipped("scan", "security scan disabled"),
            ],
            false,
        );
        assert_eq!(r.exit_code(), 0);
    }

    #[test]
    fn any_failure_exits_nonzero() {
        let r = report(
            vec![
                StepResult::succeeded("prune", Duration::ZERO),
                StepResult::failed("clean", Duration::ZERO, "exit code Some(1)"),
            ],
            false,
        );
        assert!(!r.success());
        assert_eq!(r.exit_code(), 1);
    }

    #[test]
    fn step_timeout_exits_nonzero() {
        let r = report(
            vec![StepResult::timed_out("dump", Duration::from_secs(600), 600)],
            false,
        );
        assert_eq!(r.exit_code(), 1);
    }

    #[test]
    fn workflow_timeout_exits_124() {
        let r = report(vec![StepResult::succeeded("prune", Duration::ZERO)], true);
        assert_eq!(r.exit_code(), 124);
        assert!(!r.success());
    }

    #[test]
    fn counts_by_status() {
        let r = report(
            vec![
                StepResult::succeeded("prune", Duration::ZERO),
                StepResult::failed("clean", Duration::ZERO, "boom"),
                StepResult::skipped("scan", "disabled"),
                StepResult::skipped("commit", "halted"),
            ],
            false,
        );
        assert_eq!(r.count(StepStatus::Succeeded), 1);
        assert_eq!(r.count(StepStatus::Failed), 1);
        assert_eq!(r.count(StepStatus::Skipped), 2);
        assert_eq!(r.count(StepStatus::TimedOut), 0);
    }
}
