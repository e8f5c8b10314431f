//! A single translation job driven from upload to a terminal state.
//!
//! [`TranslationSession`] holds at most one [`TranslationTask`]. It runs the
//! async side of the pipeline: submitting the upload, sleeping between status
//! checks, retrying individual queries, and publishing snapshots to watchers.
//! All decisions about intervals, progress and failure thresholds are
//! delegated to [`Poller`].
//!
//! ## Cancellation
//!
//! [`reset`](TranslationSession::reset) bumps an epoch counter and cancels a
//! [`CancellationToken`]. Any in-flight submit or poll returns
//! [`TranslateError::Cancelled`], and a response that arrives for an older
//! epoch is dropped without touching the new state. At most one poll loop
//! runs per session; a second concurrent [`poll`](TranslationSession::poll)
//! is rejected.

use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::output::TranslationResult;
use crate::pipeline::poller::{NextWake, PollStep, Poller};
use crate::pipeline::submit;
use crate::pipeline::upload::PdfUpload;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::provider::{self, TranslationProvider};
use crate::task::{TaskStatus, TranslationTask};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
struct Slot {
    epoch: u64,
    task: Option<TranslationTask>,
    cancel: CancellationToken,
    polling: bool,
}

/// Drives one translation task against a provider.
///
/// Cheap to share behind an [`Arc`]: every method takes `&self`, so one
/// caller can poll while another resets or watches.
pub struct TranslationSession {
    provider: Arc<dyn TranslationProvider>,
    config: TranslationConfig,
    poller: Poller,
    callback: ProgressCallback,
    slot: Mutex<Slot>,
    state_tx: watch::Sender<Option<TranslationTask>>,
}

impl std::fmt::Debug for TranslationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationSession")
            .field("provider", &self.provider.name())
            .field("task", &self.snapshot())
            .finish()
    }
}

/// Clears the polling flag however the poll future ends, drop included.
struct PollGuard<'a> {
    session: &'a TranslationSession,
    epoch: u64,
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.session.slot();
        if slot.epoch == self.epoch {
            slot.polling = false;
        }
    }
}

impl TranslationSession {
    pub fn new(provider: Arc<dyn TranslationProvider>, config: TranslationConfig) -> Self {
        let (state_tx, _) = watch::channel(None);
        let callback = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));
        Self {
            poller: Poller::new(config.schedule, config.failure_tolerance),
            provider,
            config,
            callback,
            slot: Mutex::new(Slot {
                epoch: 0,
                task: None,
                cancel: CancellationToken::new(),
                polling: false,
            }),
            state_tx,
        }
    }

    /// Session backed by the provider `config` selects.
    pub fn from_config(config: TranslationConfig) -> Result<Self, TranslateError> {
        let provider = provider::resolve_provider(&config)?;
        Ok(Self::new(provider, config))
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Current task, if any.
    pub fn snapshot(&self) -> Option<TranslationTask> {
        self.slot().task.clone()
    }

    /// `Idle` when no task exists.
    pub fn status(&self) -> TaskStatus {
        self.slot()
            .task
            .as_ref()
            .map(|t| t.status)
            .unwrap_or_default()
    }

    /// Receive a snapshot after every state change. `None` means idle.
    pub fn subscribe(&self) -> watch::Receiver<Option<TranslationTask>> {
        self.state_tx.subscribe()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, task: Option<TranslationTask>) {
        self.state_tx.send_replace(task);
    }

    /// Validate `upload` and create a provider task.
    ///
    /// On success the task is `Translating` and its provider id is returned.
    /// Any failure leaves the task in `Error` and is returned as-is; nothing
    /// is retried.
    pub async fn submit(&self, upload: &PdfUpload) -> Result<String, TranslateError> {
        let params = self.config.submit_params();
        let (epoch, cancel) = {
            let mut slot = self.slot();
            if let Some(task) = slot.task.as_ref().filter(|t| !t.is_terminal()) {
                return Err(TranslateError::InvalidState(format!(
                    "task {} is {}; reset before submitting another file",
                    task.task_id,
                    task.status.as_str()
                )));
            }
            let task = TranslationTask::uploading(upload.file_name(), &params);
            slot.task = Some(task.clone());
            self.publish(Some(task));
            (slot.epoch, slot.cancel.clone())
        };

        self.callback.on_upload_start(upload.file_name(), upload.size());
        let max = self.config.max_file_size;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TranslateError::Cancelled),
            r = submit::submit(self.provider.as_ref(), upload, &params, max) => r,
        };

        let mut slot = self.slot();
        if slot.epoch != epoch {
            debug!("Dropping submit outcome for a reset session");
            return Err(TranslateError::Cancelled);
        }
        let Some(task) = slot.task.as_mut() else {
            return Err(TranslateError::Cancelled);
        };

        match outcome {
            Ok(created) => {
                task.task_id = created.task_id.clone();
                task.status = TaskStatus::Translating;
                task.message = created.message;
                let snapshot = task.clone();
                drop(slot);
                self.publish(Some(snapshot));
                self.callback.on_submitted(&created.task_id);
                Ok(created.task_id)
            }
            Err(e) => {
                task.fail(&e);
                let snapshot = task.clone();
                drop(slot);
                self.publish(Some(snapshot));
                self.callback.on_failed(&e.to_string());
                Err(e)
            }
        }
    }

    /// Track an existing provider task without uploading anything.
    pub fn attach(&self, task_id: &str) -> Result<(), TranslateError> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(TranslateError::InvalidState("task id must not be empty".into()));
        }
        let mut slot = self.slot();
        if let Some(task) = slot.task.as_ref().filter(|t| !t.is_terminal()) {
            return Err(TranslateError::InvalidState(format!(
                "task {} is still {}",
                task.task_id,
                task.status.as_str()
            )));
        }
        let task = TranslationTask::translating(task_id, &self.config.submit_params());
        slot.task = Some(task.clone());
        self.publish(Some(task));
        info!("Attached to task {}", task_id);
        Ok(())
    }

    /// Poll the current task until it completes, fails, times out, or the
    /// session is reset.
    pub async fn poll(&self) -> Result<TranslationResult, TranslateError> {
        let (epoch, cancel, task_id) = {
            let mut slot = self.slot();
            let task = slot
                .task
                .as_ref()
                .ok_or_else(|| TranslateError::InvalidState("no task to poll".into()))?;
            if task.status != TaskStatus::Translating {
                return Err(TranslateError::InvalidState(format!(
                    "task {} is {}, not translating",
                    task.task_id,
                    task.status.as_str()
                )));
            }
            if slot.polling {
                return Err(TranslateError::InvalidState(
                    "task is already being polled".into(),
                ));
            }
            let task_id = task.task_id.clone();
            slot.polling = true;
            (slot.epoch, slot.cancel.clone(), task_id)
        };
        let _guard = PollGuard {
            session: self,
            epoch,
        };

        info!("Polling task {} on {}", task_id, self.provider.name());
        let started = Instant::now();
        let policy = self.config.retry_policy();
        let provider = self.provider.as_ref();
        let id = task_id.as_str();
        let mut interval: Option<Duration> = None;

        loop {
            let (wake, check) = {
                let mut slot = self.slot();
                if slot.epoch != epoch {
                    return Err(TranslateError::Cancelled);
                }
                let Some(task) = slot.task.as_mut() else {
                    return Err(TranslateError::Cancelled);
                };
                match self.poller.next_wake(task, started.elapsed()) {
                    NextWake::Expired => {
                        let err = self.poller.expire(task);
                        let snapshot = task.clone();
                        drop(slot);
                        error!("{}", err);
                        self.publish(Some(snapshot));
                        self.callback.on_failed(&err.to_string());
                        return Err(err);
                    }
                    NextWake::After(d) => (d, task.check_count + 1),
                }
            };

            // Report schedule changes, not the shortened wait before the deadline.
            let scheduled = self.poller.schedule.interval_for_check(check);
            if let Some(prev) = interval.filter(|p| *p != scheduled) {
                info!(
                    "Poll interval {}s → {}s before check #{}",
                    prev.as_secs(),
                    scheduled.as_secs(),
                    check
                );
                self.callback.on_interval_changed(prev, scheduled);
            }
            interval = Some(scheduled);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TranslateError::Cancelled),
                _ = sleep(wake) => {}
            }

            let label = format!("status check #{check} for {task_id}");
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TranslateError::Cancelled),
                r = policy.run(&label, move |_| provider.query_task(id)) => r,
            };

            let (step, snapshot) = {
                let mut slot = self.slot();
                if slot.epoch != epoch {
                    debug!("Dropping stale status response for {}", task_id);
                    return Err(TranslateError::Cancelled);
                }
                let Some(task) = slot.task.as_mut() else {
                    return Err(TranslateError::Cancelled);
                };
                let step = match &outcome {
                    Ok(resp) => self.poller.apply_response(task, resp),
                    Err(e) => self.poller.apply_failure(task, e),
                };
                (step, task.clone())
            };
            self.publish(Some(snapshot));

            match step {
                PollStep::Continue { progress } => {
                    info!("Task {}: check #{} at {}%", task_id, check, progress);
                    self.callback.on_status_check(check, progress);
                }
                PollStep::CheckFailed { consecutive, error } => {
                    warn!(
                        "Task {}: check #{} failed ({} in a row): {}",
                        task_id, check, consecutive, error
                    );
                    self.callback.on_check_failed(consecutive, &error.to_string());
                }
                PollStep::Completed(result) => {
                    info!(
                        "Task {} completed after {} checks in {:.1}s",
                        task_id,
                        check,
                        started.elapsed().as_secs_f64()
                    );
                    self.callback.on_completed(&result);
                    return Ok(result);
                }
                PollStep::Failed(err) => {
                    error!("Task {} failed: {}", task_id, err);
                    self.callback.on_failed(&err.to_string());
                    return Err(err);
                }
            }
        }
    }

    /// Submit `upload` and poll it to a terminal state.
    pub async fn run(&self, upload: &PdfUpload) -> Result<TranslationResult, TranslateError> {
        self.submit(upload).await?;
        self.poll().await
    }

    /// Attach to `task_id` and poll it to a terminal state.
    pub async fn resume(&self, task_id: &str) -> Result<TranslationResult, TranslateError> {
        self.attach(task_id)?;
        self.poll().await
    }

    /// Discard the current task and cancel any in-flight work.
    ///
    /// Safe to call at any time, including while another caller is inside
    /// [`submit`](Self::submit) or [`poll`](Self::poll).
    pub fn reset(&self) {
        let mut slot = self.slot();
        slot.cancel.cancel();
        slot.cancel = CancellationToken::new();
        slot.epoch += 1;
        slot.polling = false;
        if let Some(task) = slot.task.take() {
            info!("Reset session; discarded task {}", task.task_id);
        }
        drop(slot);
        self.publish(None);
    }
}
