//! Status poller: interval schedule, progress estimation, and the state
//! transitions applied after each status check.
//!
//! Everything in this module is synchronous and clock-free. The async loop
//! that sleeps, queries, and honours cancellation lives in
//! [`crate::session::TranslationSession::poll`]; it asks [`Poller::next_wake`]
//! how long to sleep and feeds every query outcome back through
//! [`Poller::apply_response`] or [`Poller::apply_failure`]. Keeping the
//! decisions here makes the schedule and thresholds testable without timers.
//!
//! ## Schedule
//!
//! ```text
//! check   1  2  3 | 4 … 12 | 13 …
//! wait    3s 3s 3s| 10s    | 20s
//! ```
//!
//! The wait before check *i* is [`PollSchedule::interval_for_check`]`(i)`.
//! Polling stops with a timeout once `max_wait` has elapsed or
//! `ceil(max_wait / standard_interval)` checks were issued, whichever comes
//! first.

use crate::error::TranslateError;
use crate::output::TranslationResult;
use crate::pipeline::resolver;
use crate::provider::{ProviderStatus, StatusResponse};
use crate::task::{TaskStatus, TranslationTask};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Adaptive polling intervals and the global wait bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSchedule {
    /// Wait before each of the first `standard_after` checks. Default: 3 s.
    pub initial_interval: Duration,
    /// Wait before checks `standard_after + 1 ..= slow_after`. Default: 10 s.
    pub standard_interval: Duration,
    /// Wait before every later check. Default: 20 s.
    pub slow_interval: Duration,
    /// Default: 3.
    pub standard_after: u32,
    /// Default: 12.
    pub slow_after: u32,
    /// Total wait before giving up. Default: 20 min.
    pub max_wait: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(3),
            standard_interval: Duration::from_secs(10),
            slow_interval: Duration::from_secs(20),
            standard_after: 3,
            slow_after: 12,
            max_wait: Duration::from_secs(20 * 60),
        }
    }
}

/// What the poll loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextWake {
    /// Sleep this long, then issue the next check.
    After(Duration),
    /// The wait bound is exhausted.
    Expired,
}

impl PollSchedule {
    /// Wait before issuing check `check` (1-indexed).
    pub fn interval_for_check(&self, check: u32) -> Duration {
        if check <= self.standard_after {
            self.initial_interval
        } else if check <= self.slow_after {
            self.standard_interval
        } else {
            self.slow_interval
        }
    }

    /// `ceil(max_wait / standard_interval)`: 120 with the defaults.
    pub fn max_checks(&self) -> u32 {
        let standard = self.standard_interval.as_millis().max(1);
        let checks = self.max_wait.as_millis().div_ceil(standard);
        u32::try_from(checks).unwrap_or(u32::MAX)
    }

    /// The single authority on when the next check happens.
    ///
    /// `checks_issued` is the task's `check_count`; `elapsed` is time spent
    /// polling so far. The wait never runs past `max_wait`.
    pub fn next_wake(&self, checks_issued: u32, elapsed: Duration) -> NextWake {
        if checks_issued >= self.max_checks() || elapsed >= self.max_wait {
            NextWake::Expired
        } else {
            let remaining = self.max_wait - elapsed;
            NextWake::After(self.interval_for_check(checks_issued + 1).min(remaining))
        }
    }

    pub(crate) fn validate(&self) -> Result<(), TranslateError> {
        if self.initial_interval.is_zero()
            || self.standard_interval.is_zero()
            || self.slow_interval.is_zero()
        {
            return Err(TranslateError::InvalidConfig(
                "poll intervals must be non-zero".into(),
            ));
        }
        if self.standard_after > self.slow_after {
            return Err(TranslateError::InvalidConfig(format!(
                "standard_after ({}) must not exceed slow_after ({})",
                self.standard_after, self.slow_after
            )));
        }
        if self.max_wait.is_zero() {
            return Err(TranslateError::InvalidConfig("max wait must be non-zero".into()));
        }
        Ok(())
    }
}

/// Approximate progress when the provider does not report any.
///
/// Rises quickly to 20 %, climbs to 70 % over the next ten checks, then
/// creeps towards 95 %. It never reaches 100; only a `Completed` status does.
pub fn estimate_progress(check_count: u32) -> u8 {
    let n = check_count;
    let estimate = if n < 5 {
        (n * 4).min(20)
    } else if n < 15 {
        (20 + (n - 5) * 5).min(70)
    } else {
        70u32.saturating_add(n - 15).min(95)
    };
    estimate as u8
}

/// Effect of one status check on the task.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// Still running; keep polling.
    Continue { progress: u8 },
    /// The check failed but the failure budget is not exhausted.
    CheckFailed { consecutive: u32, error: TranslateError },
    /// Terminal success.
    Completed(TranslationResult),
    /// Terminal failure; the task is in `Error`.
    Failed(TranslateError),
}

/// Applies check outcomes to a [`TranslationTask`].
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub schedule: PollSchedule,
    /// Consecutive failed checks tolerated; one more fails the task.
    pub failure_tolerance: u32,
}

impl Poller {
    pub fn new(schedule: PollSchedule, failure_tolerance: u32) -> Self {
        Self {
            schedule,
            failure_tolerance,
        }
    }

    pub fn next_wake(&self, task: &TranslationTask, elapsed: Duration) -> NextWake {
        self.schedule.next_wake(task.check_count, elapsed)
    }

    /// Record a successful status response.
    pub fn apply_response(&self, task: &mut TranslationTask, resp: &StatusResponse) -> PollStep {
        task.check_count += 1;
        task.consecutive_failures = 0;
        let message = resp.message_text();
        if let Some(msg) = &message {
            task.message = Some(msg.clone());
        }
        task.status = TaskStatus::from(resp.status);

        match resp.status {
            ProviderStatus::Completed => {
                let result = resolver::resolve_completion(resp);
                task.progress = 100;
                task.result = Some(result.clone());
                PollStep::Completed(result)
            }
            ProviderStatus::Terminated => {
                // This response's message only, never a stale progress note.
                let err = TranslateError::Terminated {
                    message: message.unwrap_or_else(|| "no reason given".to_string()),
                };
                task.fail(&err);
                PollStep::Failed(err)
            }
            ProviderStatus::Waiting | ProviderStatus::Processing => {
                // A reported 0 carries no information; estimate instead.
                let reported = resp.progress.filter(|p| *p > 0);
                let next = reported.unwrap_or_else(|| estimate_progress(task.check_count));
                task.progress = next.min(99).max(task.progress);
                PollStep::Continue {
                    progress: task.progress,
                }
            }
        }
    }

    /// Record a status check that failed after all retries.
    pub fn apply_failure(&self, task: &mut TranslationTask, err: &TranslateError) -> PollStep {
        task.check_count += 1;
        task.failed_checks += 1;

        if !err.is_transient() {
            task.fail(err);
            return PollStep::Failed(err.clone());
        }

        task.consecutive_failures += 1;
        if task.consecutive_failures > self.failure_tolerance {
            let failed = TranslateError::StatusCheckFailed {
                failures: task.consecutive_failures,
                last_error: err.to_string(),
            };
            task.fail(&failed);
            return PollStep::Failed(failed);
        }

        PollStep::CheckFailed {
            consecutive: task.consecutive_failures,
            error: err.clone(),
        }
    }

    /// Fail the task because the wait bound ran out.
    pub fn expire(&self, task: &mut TranslationTask) -> TranslateError {
        let err = TranslateError::Timeout {
            limit_secs: self.schedule.max_wait.as_secs(),
            checks: task.check_count,
        };
        task.fail(&err);
        err
    }
}
