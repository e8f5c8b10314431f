//! One-call translation entry points.
//!
//! These wrap a [`TranslationSession`] for the common case: translate one
//! file and wait for the result. Use the session directly when you need to
//! reset mid-flight or drive several phases yourself.

use crate::config::TranslationConfig;
use crate::credits;
use crate::error::TranslateError;
use crate::output::{TranslationOutput, TranslationResult, TranslationStats};
use crate::pipeline::download::{self, DownloadedFile};
use crate::pipeline::poller::{PollStep, Poller};
use crate::pipeline::upload::PdfUpload;
use crate::provider::{self, TranslationProvider};
use crate::session::TranslationSession;
use crate::task::TranslationTask;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Timeout for fetching the translated artefact.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Translate the PDF at `path` and wait for the result.
///
/// # Errors
/// Validation errors (missing file, wrong type, too large) are returned
/// before any network call. Provider and polling failures are returned once
/// the task reaches `Error`.
pub async fn translate(
    path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let upload = PdfUpload::from_path(path)?;
    let provider = provider::resolve_provider(config)?;
    translate_with(provider, &upload, config).await
}

/// Translate in-memory PDF bytes.
///
/// The bytes are spooled to a managed temp file that is removed when this
/// function returns, whatever the outcome.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_translate::{translate_bytes, TranslationConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("document.pdf")?;
/// let config = TranslationConfig::builder().target_lang("de").build()?;
/// let output = translate_bytes(&bytes, "document.pdf", &config).await?;
/// println!("{}", output.result.download_label());
/// # Ok(())
/// # }
/// ```
pub async fn translate_bytes(
    bytes: &[u8],
    file_name: &str,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let upload = PdfUpload::from_bytes(bytes, file_name)?;
    let provider = provider::resolve_provider(config)?;
    translate_with(provider, &upload, config).await
}

/// Translate `upload` on an explicit provider.
pub async fn translate_with(
    provider: Arc<dyn TranslationProvider>,
    upload: &PdfUpload,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    // Reject locally before building anything network-facing.
    upload.validate(config.max_file_size)?;

    let total_start = Instant::now();
    let session = TranslationSession::new(provider, config.clone());

    let upload_start = Instant::now();
    session.submit(upload).await?;
    let upload_duration_ms = upload_start.elapsed().as_millis() as u64;

    let poll_start = Instant::now();
    let result = session.poll().await?;
    let poll_duration_ms = poll_start.elapsed().as_millis() as u64;

    finish(&session, result, config, |stats| {
        stats.upload_duration_ms = upload_duration_ms;
        stats.poll_duration_ms = poll_duration_ms;
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    })
    .await
}

/// Resume polling a task created earlier, without uploading again.
pub async fn resume(
    task_id: &str,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let provider = provider::resolve_provider(config)?;
    resume_with(provider, task_id, config).await
}

pub async fn resume_with(
    provider: Arc<dyn TranslationProvider>,
    task_id: &str,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let start = Instant::now();
    let session = TranslationSession::new(provider, config.clone());
    let result = session.resume(task_id).await?;
    finish(&session, result, config, |stats| {
        stats.poll_duration_ms = start.elapsed().as_millis() as u64;
        stats.total_duration_ms = stats.poll_duration_ms;
    })
    .await
}

async fn finish(
    session: &TranslationSession,
    result: TranslationResult,
    config: &TranslationConfig,
    timings: impl FnOnce(&mut TranslationStats),
) -> Result<TranslationOutput, TranslateError> {
    let task = session
        .snapshot()
        .ok_or_else(|| TranslateError::Internal("completed task vanished from session".into()))?;

    let mut stats = TranslationStats {
        status_checks: task.check_count,
        failed_checks: task.failed_checks,
        ..Default::default()
    };
    timings(&mut stats);

    let credits_remaining = refresh_credits(config).await;

    info!(
        "Translated '{}' ({} → {}) in {}ms, {} status checks",
        task.file_name,
        task.source_language,
        task.target_language,
        stats.total_duration_ms,
        stats.status_checks
    );

    Ok(TranslationOutput {
        task,
        result,
        stats,
        credits_remaining,
    })
}

/// Refresh the credit balance after a job. Failures are logged, never fatal.
async fn refresh_credits(config: &TranslationConfig) -> Option<i64> {
    let url = config.credits_webhook_url.as_deref()?;
    match credits::fetch_credit_balance(url).await {
        Ok(balance) => Some(balance.credits),
        Err(e) => {
            warn!("Could not refresh credit balance: {}", e);
            None
        }
    }
}

/// Translate `path` and download the translated PDF to `output_path`.
///
/// The file is written atomically (temp file + rename).
pub async fn translate_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<(TranslationOutput, DownloadedFile), TranslateError> {
    let output = translate(path, config).await?;
    let file = download_file(&output.result, output_path).await?;
    Ok((output, file))
}

/// Download the translated PDF of a completed task.
pub async fn download_file(
    result: &TranslationResult,
    dest: impl AsRef<Path>,
) -> Result<DownloadedFile, TranslateError> {
    let url = result
        .download_url()
        .ok_or_else(|| TranslateError::DownloadFailed {
            url: String::new(),
            reason: "provider returned no translated file URL".into(),
        })?;
    download::download_to(url, dest.as_ref(), DOWNLOAD_TIMEOUT_SECS).await
}

/// Query a task once (with per-query retries) and return its snapshot.
///
/// A `Terminated` task is returned as a snapshot in `Error`, not as `Err`;
/// `Err` means the status could not be obtained.
pub async fn check_status(
    task_id: &str,
    config: &TranslationConfig,
) -> Result<TranslationTask, TranslateError> {
    let provider = provider::resolve_provider(config)?;
    check_status_with(provider.as_ref(), task_id, config).await
}

pub async fn check_status_with(
    provider: &dyn TranslationProvider,
    task_id: &str,
    config: &TranslationConfig,
) -> Result<TranslationTask, TranslateError> {
    let label = format!("status of {task_id}");
    let resp = config
        .retry_policy()
        .run(&label, |_| provider.query_task(task_id))
        .await?;

    let mut task = TranslationTask::translating(task_id, &config.submit_params());
    let poller = Poller::new(config.schedule, config.failure_tolerance);
    match poller.apply_response(&mut task, &resp) {
        PollStep::Failed(err) => info!("Task {} is in error: {}", task_id, err),
        // One lookup says nothing about how far along the job is.
        PollStep::Continue { .. } => task.progress = resp.progress.unwrap_or(0).min(99),
        _ => {}
    }
    Ok(task)
}

/// Blocking wrapper around [`translate`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn translate_sync(
    path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(translate(path, config))
}
