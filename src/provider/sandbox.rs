//! In-process provider for demos and offline runs.
//!
//! Tasks are kept in memory and finish a fixed time after creation. Ids are
//! prefixed `sandbox-` and the result URLs point at `example.com`, so a
//! sandbox result can never be mistaken for a real translation.

use super::{CreatedTask, ProviderStatus, StatusResponse, TranslationProvider};
use crate::error::TranslateError;
use crate::pipeline::submit::SubmitParams;
use crate::pipeline::upload::PdfUpload;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Simulated provider. Each task reports `Processing` until `duration` has
/// elapsed, then `Completed` once; after that the id is forgotten.
#[derive(Debug)]
pub struct SandboxProvider {
    duration: Duration,
    tasks: Mutex<HashMap<String, Instant>>,
}

impl Default for SandboxProvider {
    fn default() -> Self {
        Self::with_duration(Duration::from_secs(5))
    }
}

impl SandboxProvider {
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn started_at(&self, task_id: &str) -> Option<Instant> {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.get(task_id).copied()
    }
}

#[async_trait]
impl TranslationProvider for SandboxProvider {
    fn name(&self) -> &str {
        "sandbox"
    }

    async fn create_task(
        &self,
        upload: &PdfUpload,
        params: &SubmitParams,
    ) -> Result<CreatedTask, TranslateError> {
        let task_id = format!("sandbox-{}", uuid::Uuid::new_v4());
        info!(
            "Sandbox task {} for '{}' ({} → {})",
            task_id,
            upload.file_name(),
            params.source_lang,
            params.target_lang
        );
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(task_id.clone(), Instant::now());
        Ok(CreatedTask {
            task_id,
            message: Some("Sandbox translation started".into()),
        })
    }

    async fn query_task(&self, task_id: &str) -> Result<StatusResponse, TranslateError> {
        let started = self
            .started_at(task_id)
            .ok_or_else(|| TranslateError::NotFound {
                task_id: task_id.to_string(),
            })?;
        let elapsed = started.elapsed();

        if elapsed < self.duration {
            let progress = (elapsed.as_millis() / 50).min(90) as u8;
            return Ok(StatusResponse {
                message: Some(Value::from("Sandbox translation in progress")),
                ..StatusResponse::processing(Some(progress))
            });
        }

        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(task_id);
        Ok(StatusResponse {
            status: ProviderStatus::Completed,
            progress: Some(100),
            translated_file_url: Some(Value::from(
                "https://example.com/sandbox-translated-file.pdf",
            )),
            translated_bilingual_file_url: Some(Value::from(
                "https://example.com/sandbox-bilingual-file.pdf",
            )),
            used_credits: Some(Value::from(10)),
            token_count: Some(Value::from(5000)),
            message: Some(Value::from("Sandbox translation completed")),
        })
    }
}
