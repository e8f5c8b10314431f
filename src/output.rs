//! Output types returned by the translation entry points.

use crate::task::TranslationTask;
use serde::{Deserialize, Serialize};

/// Artefacts and usage figures extracted from a `Completed` status response.
///
/// Every field is a string because the provider is loose about types
/// (`usedCredits` arrives as a number, sometimes as a string). See
/// [`crate::pipeline::resolver`] for the coercion rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Download link for the translated PDF.
    pub translated_file_url: Option<String>,
    /// Download link for the side-by-side bilingual PDF, when produced.
    pub bilingual_file_url: Option<String>,
    /// Credits charged for the job (display only).
    pub used_credits: Option<String>,
    /// Tokens processed by the provider (display only).
    pub token_count: Option<String>,
}

impl TranslationResult {
    /// The primary download link, if the provider returned one.
    pub fn download_url(&self) -> Option<&str> {
        self.translated_file_url.as_deref()
    }

    /// The primary download link, or `"unavailable"` for display.
    pub fn download_label(&self) -> &str {
        self.download_url().unwrap_or("unavailable")
    }
}

/// Timing and counters for one translation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Status queries issued (successful or not).
    pub status_checks: u32,
    /// Status checks that failed after all retries.
    pub failed_checks: u32,
    /// Wall-clock time spent on the upload request.
    pub upload_duration_ms: u64,
    /// Wall-clock time spent polling.
    pub poll_duration_ms: u64,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
}

/// Everything known about a finished translation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    /// Final task snapshot (status `Completed`).
    pub task: TranslationTask,
    /// Extracted artefacts.
    pub result: TranslationResult,
    /// Counters and timings.
    pub stats: TranslationStats,
    /// Credit balance after the job, when a credits webhook is configured.
    pub credits_remaining: Option<i64>,
}
