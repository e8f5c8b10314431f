//! The translation task record and its local status vocabulary.

use crate::error::{ErrorKind, TranslateError};
use crate::output::TranslationResult;
use crate::pipeline::submit::SubmitParams;
use crate::provider::ProviderStatus;
use serde::{Deserialize, Serialize};

/// Local lifecycle of a translation task.
///
/// ```text
/// Idle ──▶ Uploading ──▶ Translating ──▶ Completed
///              │              │
///              └──────────────┴────────▶ Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Idle,
    Uploading,
    Translating,
    Completed,
    Error,
}

impl TaskStatus {
    /// No further polling happens from a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Uploading => "uploading",
            TaskStatus::Translating => "translating",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

impl From<ProviderStatus> for TaskStatus {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::Waiting | ProviderStatus::Processing => TaskStatus::Translating,
            ProviderStatus::Completed => TaskStatus::Completed,
            ProviderStatus::Terminated => TaskStatus::Error,
        }
    }
}

/// Serializable summary of the error that ended a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TranslateError> for TaskError {
    fn from(err: &TranslateError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One in-flight or finished translation job.
///
/// Created at submission, mutated only by the poller and resolver, and
/// discarded when its session is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationTask {
    /// Provider task id, or a `pending-…` placeholder while uploading.
    pub task_id: String,
    pub file_name: String,
    pub source_language: String,
    pub target_language: String,
    pub model: String,
    pub status: TaskStatus,
    /// 0–100. Estimated from `check_count` when the provider omits it.
    pub progress: u8,
    /// Populated only once the status is `Completed`.
    pub result: Option<TranslationResult>,
    /// Status queries issued so far, failed ones included.
    pub check_count: u32,
    /// Failed checks since the last successful one.
    pub consecutive_failures: u32,
    /// Failed checks over the task's lifetime.
    pub failed_checks: u32,
    /// Last message the provider attached to a response.
    pub message: Option<String>,
    pub error: Option<TaskError>,
}

impl TranslationTask {
    /// A task whose upload is about to start, keyed by a local placeholder id.
    pub fn uploading(file_name: impl Into<String>, params: &SubmitParams) -> Self {
        Self {
            task_id: format!("pending-{}", uuid::Uuid::new_v4()),
            file_name: file_name.into(),
            source_language: params.source_lang.clone(),
            target_language: params.target_lang.clone(),
            model: params.model.clone(),
            status: TaskStatus::Uploading,
            progress: 0,
            result: None,
            check_count: 0,
            consecutive_failures: 0,
            failed_checks: 0,
            message: None,
            error: None,
        }
    }

    /// A task already known to the provider (resume / status lookup).
    pub fn translating(task_id: impl Into<String>, params: &SubmitParams) -> Self {
        let mut task = Self::uploading(String::new(), params);
        task.task_id = task_id.into();
        task.status = TaskStatus::Translating;
        task
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the id is still the local placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.task_id.starts_with("pending-")
    }

    /// Move to the error state, recording `err`.
    pub(crate) fn fail(&mut self, err: &TranslateError) {
        self.status = TaskStatus::Error;
        self.error = Some(TaskError::from(err));
    }
}
