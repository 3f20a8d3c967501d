//! Workflow execution orchestration.
//!
//! The runner moves through Idle → LockAcquired → Running → Finalizing:
//! it takes the cross-process lock, resolves the requested steps against
//! the registry, executes them (sequentially, with runs of consecutive
//! parallel-eligible steps fanned out over a bounded worker pool), and
//! always releases the lock and flushes the report on the way out — the
//! lock guard's destructor covers panics as well.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::lock::LockGuard;
use crate::steps::{Registry, StepContext, StepDescriptor, StepResult};

use super::report::RunReport;

/// Skip reason recorded for steps the workflow deadline cut off.
const TIMEOUT_SKIP: &str = "workflow timeout";

/// Orchestrates one workflow run.
pub struct WorkflowRunner<'a> {
    config: &'a WorkflowConfig,
    registry: Registry,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(config: &'a WorkflowConfig) -> Self {
        Self {
            config,
            registry: Registry::builtin(config),
        }
    }

    /// The registry backing this runner (used by `--list-steps`).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the configured workflow under the cross-process lock.
    ///
    /// Errors here (lock held, unknown step) abort before any step runs;
    /// per-step failures are recorded in the report instead.
    pub fn run(&self) -> Result<RunReport> {
        let guard = LockGuard::acquire(&self.config.lock_dir, self.config.lock_ttl_secs)?;

        let outcome = self.run_locked();

        // Finalizing: release the lock on success and error paths alike
        // (Drop also covers panics inside run_locked).
        guard.release();

        let report = outcome?;
        report.log_summary();
        Ok(report)
    }

    fn run_locked(&self) -> Result<RunReport> {
        let selected = self.registry.resolve(&self.config.steps)?;

        info!("{}", "=".repeat(60));
        info!("ROUTINE WORKFLOW START");
        info!(
            "Root: {} | Dry-run: {} | Workers: {}",
            self.config.project_root.display(),
            self.config.dry_run,
            self.config.max_workers
        );
        info!("{}", "=".repeat(60));

        Ok(self.execute(&selected))
    }

    /// The Running state: launch steps until done, halted, or out of time.
    fn execute(&self, selected: &[&StepDescriptor]) -> RunReport {
        let start = Instant::now();
        let deadline = (self.config.workflow_timeout_secs > 0)
            .then(|| start + Duration::from_secs(self.config.workflow_timeout_secs));
        let ctx = StepContext::with_deadline(self.config, deadline);

        let mut results: Vec<StepResult> = Vec::with_capacity(selected.len());
        let mut timed_out = false;
        let mut halted_by: Option<&'static str> = None;

        let mut queue: VecDeque<&StepDescriptor> = selected.iter().copied().collect();
        while let Some(descriptor) = queue.pop_front() {
            if let Some(fatal_step) = halted_by {
                results.push(StepResult::skipped(
                    descriptor.name(),
                    format!("halted by fatal failure of '{}'", fatal_step),
                ));
                continue;
            }
            if past_deadline(deadline) {
                timed_out = true;
                results.push(StepResult::skipped(descriptor.name(), TIMEOUT_SKIP));
                continue;
            }

            if descriptor.parallel {
                // Fan out the whole run of consecutive parallel-eligible steps.
                let mut batch = vec![descriptor];
                while queue.front().is_some_and(|d| d.parallel) {
                    batch.push(queue.pop_front().expect("peeked"));
                }
                let (batch_results, batch_timed_out) = self.run_batch(&ctx, &batch, deadline);
                timed_out |= batch_timed_out;
                for (d, result) in batch.iter().zip(&batch_results) {
                    if d.fatal && result.status.is_failure() {
                        error!("Fatal step '{}' failed — aborting workflow", d.name());
                        halted_by = Some(d.name());
                    }
                }
                results.extend(batch_results);
            } else {
                let result = run_step(&ctx, descriptor);
                if descriptor.fatal && result.status.is_failure() {
                    error!(
                        "Fatal step '{}' failed — aborting workflow",
                        descriptor.name()
                    );
                    halted_by = Some(descriptor.name());
                }
                results.push(result);
            }
        }

        RunReport {
            results,
            duration: start.elapsed(),
            workflow_timed_out: timed_out,
        }
    }

    /// Execute a batch of parallel-eligible steps on a bounded worker pool.
    ///
    /// Results come back in batch order regardless of completion order; a
    /// worker that reaches the deadline stops launching and marks the rest
    /// of its pulls skipped.
    fn run_batch(
        &self,
        ctx: &StepContext,
        batch: &[&StepDescriptor],
        deadline: Option<Instant>,
    ) -> (Vec<StepResult>, bool) {
        let workers = self.config.max_workers.max(1).min(batch.len());
        let queue: Mutex<VecDeque<(usize, &StepDescriptor)>> =
            Mutex::new(batch.iter().copied().enumerate().collect());
        let slots: Mutex<Vec<Option<StepResult>>> = Mutex::new(vec![None; batch.len()]);
        let hit_deadline = AtomicBool::new(false);

        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| loop {
                    let Some((index, descriptor)) = queue.lock().expect("queue lock").pop_front()
                    else {
                        return;
                    };
                    let result = if past_deadline(deadline) {
                        hit_deadline.store(true, Ordering::SeqCst);
                        StepResult::skipped(descriptor.name(), TIMEOUT_SKIP)
                    } else {
                        run_step(ctx, descriptor)
                    };
                    slots.lock().expect("slots lock")[index] = Some(result);
                });
            }
        });

        let results = slots
            .into_inner()
            .expect("slots lock")
            .into_iter()
            .map(|slot| slot.expect("every batch slot filled"))
            .collect();
        (results, hit_deadline.load(Ordering::SeqCst))
    }
}

fn past_deadline(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Run one step, degrading an internal fault to a recorded failure.
fn run_step(ctx: &StepContext, descriptor: &StepDescriptor) -> StepResult {
    let started = Instant::now();
    match (descriptor.run)(ctx) {
        Ok(result) => result,
        Err(e) => {
            warn!("Step '{}' errored: {}", descriptor.name(), e);
            StepResult::failed(descriptor.name(), started.elapsed(), e.to_string())
        }
    }
}
