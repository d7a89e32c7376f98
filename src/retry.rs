//! Per-step retry execution and failure diagnostics.

use crate::error::{ErrorKind, PipelineError};
use crate::step::{Step, StepName};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// One failed attempt of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    /// The step whose attempt failed
    pub step_name: StepName,
    /// 1-based attempt number
    pub attempt: u32,
    /// The attempt budget of the step's policy
    pub max_attempts: u32,
    /// The category of the failure
    pub kind: ErrorKind,
    /// Human-readable failure message
    pub message: String,
    /// `true` when this failure ends the step and is propagated
    pub fatal: bool,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempt {}/{} failed ({}): {}",
            self.step_name, self.attempt, self.max_attempts, self.kind, self.message
        )
    }
}

/// Destination for [`FailureReport`]s.
///
/// A sink only observes: it cannot change whether a step is retried.
pub trait FailureSink: Send + Sync {
    /// Records a failed attempt.
    fn record(&self, report: &FailureReport);
}

/// The default sink: emits each report as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn record(&self, report: &FailureReport) {
        if report.fatal {
            error!(
                step = %report.step_name,
                attempt = report.attempt,
                max_attempts = report.max_attempts,
                kind = %report.kind,
                "Critical failure in step '{}': {}",
                report.step_name,
                report.message
            );
        } else {
            warn!(
                step = %report.step_name,
                attempt = report.attempt,
                max_attempts = report.max_attempts,
                kind = %report.kind,
                "Step '{}' failed, attempt {}/{}: {}",
                report.step_name,
                report.attempt,
                report.max_attempts,
                report.message
            );
        }
    }
}

/// A sink that keeps every report in memory.
///
/// ```
/// use nagare::{FailureSink, RecordingSink};
///
/// let sink = RecordingSink::new();
/// assert!(sink.reports().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded reports, oldest first.
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of failed attempts recorded for `step_name`.
    pub fn attempts_for(&self, step_name: &str) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.step_name.as_str() == step_name)
            .count()
    }
}

impl FailureSink for RecordingSink {
    fn record(&self, report: &FailureReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
    }
}

/// Runs `step` against `value`, retrying according to the step's policy.
///
/// Every failed attempt is reported to `sink`. The loop ends on the first
/// success, or propagates the last error once the policy forbids another
/// attempt (retry disabled, non-retryable kind, or budget spent).
pub async fn run_step<T: Send>(
    step: &dyn Step<T>,
    value: &mut T,
    sink: &dyn FailureSink,
) -> Result<(), PipelineError> {
    let policy = step.retry_policy();
    let name = step.name();
    let mut attempt: u32 = 1;

    loop {
        match step.execute(value).await {
            Ok(()) => {
                info!("Step '{}' completed successfully", name);
                return Ok(());
            }
            Err(e) => {
                let fatal = !policy.should_retry(attempt, e.kind());
                sink.record(&FailureReport {
                    step_name: name.clone(),
                    attempt,
                    max_attempts: policy.max_attempts(),
                    kind: e.kind(),
                    message: e.to_string(),
                    fatal,
                });

                if fatal {
                    return Err(e);
                }

                debug!(
                    "Step '{}' retrying ({}/{})",
                    name,
                    attempt + 1,
                    policy.max_attempts()
                );
                if !policy.delay().is_zero() {
                    tokio::time::sleep(policy.delay()).await;
                }
                attempt += 1;
            }
        }
    }
}
