//! Per-step outcome types.

use std::time::Duration;

/// Terminal status of a step in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step completed successfully.
    Succeeded,

    /// Step's tool exited non-zero.
    Failed,

    /// Step's tool was killed for exceeding its timeout.
    TimedOut,

    /// Step did not run (missing tool, disabled feature, halted workflow).
    Skipped,
}

impl StepStatus {
    /// Failure for exit-code purposes (timeouts count).
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed | StepStatus::TimedOut)
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Succeeded => '✓',
            StepStatus::Failed | StepStatus::TimedOut => '✗',
            StepStatus::Skipped => '⊘',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::TimedOut => "timed out",
            StepStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Result of executing (or skipping) a step. Never mutated after the step
/// completes; consumed only by the reporter.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Canonical step name.
    pub step: &'static str,

    /// Terminal status.
    pub status: StepStatus,

    /// Wall-clock duration (zero for skips).
    pub duration: Duration,

    /// Diagnostic message (skip reason, exit code, timeout limit).
    pub detail: Option<String>,
}

impl StepResult {
    pub fn succeeded(step: &'static str, duration: Duration) -> Self {
        Self {
            step,
            status: StepStatus::Succeeded,
            duration,
            detail: None,
        }
    }

    pub fn failed(step: &'static str, duration: Duration, detail: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            duration,
            detail: Some(detail.into()),
        }
    }

    pub fn timed_out(step: &'static str, duration: Duration, limit_secs: u64) -> Self {
        Self {
            step,
            status: StepStatus::TimedOut,
            duration,
            detail: Some(format!("exceeded {}s timeout", limit_secs)),
        }
    }

    pub fn skipped(step: &'static str, reason: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            duration: Duration::ZERO,
            detail: Some(reason.into()),
        }
    }

    /// Generate a summary line for the end-of-run report.
    pub fn summary_line(&self) -> String {
        let mark = self.status.display_char();
        match (&self.status, &self.detail) {
            (StepStatus::Succeeded, _) => {
                format!("{} {} ({})", mark, self.step, format_duration(self.duration))
            }
            (_, Some(detail)) => format!("{} {} — {}: {}", mark, self.step, self.status, detail),
            (_, None) => format!("{} {} — {}", mark, self.step, self.status),
        }
    }
}

/// Render a duration the way humans read it.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_a_failure_distinct_from_failed() {
        assert!(StepStatus::TimedOut.is_failure());
        assert!(StepStatus::Failed.is_failure());
        assert_ne!(StepStatus::TimedOut, StepStatus::Failed);
    }

    #[test]
    fn skips_and_successes_are_not_failures() {
        assert!(!StepStatus::Succeeded.is_failure());
        assert!(!StepStatus::Skipped.is_failure());
    }

    #[test]
    fn status_display() {
        assert_eq!(format!("{}", StepStatus::Succeeded), "succeeded");
        assert_eq!(format!("{}", StepStatus::TimedOut), "timed out");
    }

    #[test]
    fn summary_line_includes_mark_and_name() {
        let result = StepResult::succeeded("format", Duration::from_secs(2));
        let line = result.summary_line();
        assert!(line.contains('✓'));
        assert!(line.contains("format"));
    }

    #[test]
    fn timed_out_result_carries_limit() {
        let result = StepResult::timed_out("dump", Duration::from_secs(600), 600);
        assert_eq!(result.status, StepStatus::TimedOut);
        assert!(result.detail.as_deref().unwrap().contains("600"));
        assert!(result.summary_line().contains("timed out"));
    }

    #[test]
    fn skipped_result_has_zero_duration_and_reason() {
        let result = StepResult::skipped("scan", "security scan disabled");
        assert_eq!(result.duration, Duration::ZERO);
        assert!(result.summary_line().contains("security scan disabled"));
    }

    #[test]
    fn format_duration_formats_correctly() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }
}
