//! Translation provider abstraction and its wire schema.
//!
//! The provider is a black box with two operations: accept a file and return
//! a task id, and report a task's status. [`TranslationProvider`] is the seam
//! the session talks to; [`otranslator::OTranslatorClient`] implements it over
//! HTTP and [`sandbox::SandboxProvider`] fakes it for offline demos.
//!
//! ## Strict schema at the boundary
//!
//! Every response body goes through exactly one `serde_json` parse into the
//! types below. A body that does not match (HTML error page, plain text,
//! unknown status string) becomes [`TranslateError::TransientProvider`]; there
//! is no heuristic text scraping. Inside a well-formed response, the artefact
//! fields are kept as raw [`serde_json::Value`] so that a number where a
//! string was expected is coerced later instead of failing the whole parse.

pub mod otranslator;
pub mod sandbox;

use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::pipeline::submit::SubmitParams;
use crate::pipeline::upload::PdfUpload;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Status vocabulary used by the provider. Mapped exactly; anything else is
/// a schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderStatus {
    Waiting,
    Processing,
    Completed,
    Terminated,
}

/// Successful response of the create endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    pub task_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: ProviderStatus,
    /// 0–100; `None` when absent or not numeric.
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: Option<u8>,
    #[serde(default)]
    pub translated_file_url: Option<Value>,
    #[serde(default)]
    pub translated_bilingual_file_url: Option<Value>,
    #[serde(default)]
    pub used_credits: Option<Value>,
    #[serde(default)]
    pub token_count: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

impl StatusResponse {
    /// A bare response with the given status and nothing else.
    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status,
            progress: None,
            translated_file_url: None,
            translated_bilingual_file_url: None,
            used_credits: None,
            token_count: None,
            message: None,
        }
    }

    /// `Processing`, optionally with a progress figure.
    pub fn processing(progress: Option<u8>) -> Self {
        Self {
            progress,
            ..Self::with_status(ProviderStatus::Processing)
        }
    }

    /// `Completed` with a translated file URL.
    pub fn completed(translated_file_url: impl Into<String>) -> Self {
        Self {
            progress: Some(100),
            translated_file_url: Some(Value::String(translated_file_url.into())),
            ..Self::with_status(ProviderStatus::Completed)
        }
    }

    /// `Terminated` with a provider message.
    pub fn terminated(message: impl Into<String>) -> Self {
        Self {
            message: Some(Value::String(message.into())),
            ..Self::with_status(ProviderStatus::Terminated)
        }
    }

    /// The provider message as text, if any.
    pub fn message_text(&self) -> Option<String> {
        self.message.as_ref().and_then(crate::pipeline::resolver::coerce_to_string)
    }
}

/// Parse a create-endpoint body.
pub fn parse_created(body: &str) -> Result<CreatedTask, TranslateError> {
    let created: CreatedTask =
        serde_json::from_str(body).map_err(|e| malformed("create", body, &e))?;
    if created.task_id.trim().is_empty() {
        return Err(TranslateError::TransientProvider {
            detail: "create response carried an empty taskId".into(),
        });
    }
    Ok(created)
}

/// Parse a status-endpoint body.
pub fn parse_status(body: &str) -> Result<StatusResponse, TranslateError> {
    serde_json::from_str(body).map_err(|e| malformed("status", body, &e))
}

fn malformed(endpoint: &str, body: &str, err: &serde_json::Error) -> TranslateError {
    let preview: String = body.chars().take(120).collect();
    warn!("Malformed {} response: {} (body: {:?})", endpoint, err, preview);
    TranslateError::TransientProvider {
        detail: format!("malformed {endpoint} response: {err}"),
    }
}

fn lenient_progress<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    Ok(number
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(0.0, 100.0) as u8))
}

/// A translation backend: submit a file, then ask about the task.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Short name for logs (`"otranslator"`, `"sandbox"`).
    fn name(&self) -> &str;

    /// Upload `upload` and start a translation task.
    async fn create_task(
        &self,
        upload: &PdfUpload,
        params: &SubmitParams,
    ) -> Result<CreatedTask, TranslateError>;

    /// Fetch the current status of `task_id`. One attempt, no retries.
    async fn query_task(&self, task_id: &str) -> Result<StatusResponse, TranslateError>;
}

/// Build the provider selected by `config`.
///
/// The sandbox provider is used only when `config.sandbox` is set; the HTTP
/// client is never replaced by it implicitly.
pub fn resolve_provider(
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationProvider>, TranslateError> {
    if config.sandbox {
        warn!("Sandbox mode: tasks are simulated locally, nothing is sent to the provider");
        return Ok(Arc::new(sandbox::SandboxProvider::default()));
    }
    Ok(Arc::new(otranslator::OTranslatorClient::from_config(config)?))
}
