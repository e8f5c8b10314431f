//! Error types for the edgequake-pdf-translate library.
//!
//! A single error enum, [`TranslateError`], covers every way a translation
//! job can fail, from a bad local file to a provider that stopped answering.
//! Each variant maps onto a coarse [`ErrorKind`] so callers (and the poller)
//! can decide what to do without matching on every variant:
//!
//! * **Validation / PayloadTooLarge**: caught before any network call.
//! * **Auth / NotFound / ProviderRejected**: the provider said no; retrying
//!   the same request will not help.
//! * **TransientProvider**: network blip, 5xx, timeout, or a response that
//!   failed schema validation. Safe to retry.
//! * **Timeout / Terminated**: terminal outcomes of the polling loop.
//!
//! The enum is `Clone` so the same failure can be recorded on the
//! [`crate::task::TranslationTask`] snapshot and returned to the caller.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`TranslateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    PayloadTooLarge,
    TransientProvider,
    NotFound,
    Timeout,
    Terminated,
    ProviderRejected,
    Cancelled,
    InvalidState,
    Config,
    Io,
    Internal,
}

/// All errors returned by the edgequake-pdf-translate library.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    // ── Validation errors (no network) ────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file is not a PDF (declared MIME type or magic bytes).
    #[error("Unsupported file type '{mime_type}'. Please upload a PDF file (application/pdf).")]
    UnsupportedFileType { mime_type: String },

    /// The file is empty; the provider rejects zero-byte uploads.
    #[error("File '{path}' is empty")]
    EmptyFile { path: PathBuf },

    /// File exceeds the upload limit, detected locally or reported by the
    /// provider as HTTP 413.
    #[error("File size exceeds the maximum allowed limit ({}).{}", format_mb(.limit), size_suffix(.size))]
    PayloadTooLarge { size: Option<u64>, limit: u64 },

    // ── Provider errors ───────────────────────────────────────────────────
    /// Credentials missing or rejected (HTTP 401/403).
    #[error("Authentication failed: {detail}\nSet OTRANSLATOR_API_KEY or pass --api-key.")]
    Auth { detail: String },

    /// The provider does not know this task id (HTTP 404).
    #[error("Translation task '{task_id}' not found. The task ID may be invalid or expired.")]
    NotFound { task_id: String },

    /// Network failure, 5xx, 429, request timeout, or a malformed response.
    #[error("Translation provider unavailable: {detail}")]
    TransientProvider { detail: String },

    /// Any other non-success status the provider returned.
    #[error("Translation provider rejected the request (HTTP {status}): {detail}")]
    ProviderRejected { status: u16, detail: String },

    /// The provider reported the task as `Terminated`.
    #[error("Translation terminated by provider: {message}")]
    Terminated { message: String },

    // ── Polling outcomes ──────────────────────────────────────────────────
    /// Total wait exceeded the configured bound without a terminal status.
    #[error("Translation did not finish within {limit_secs}s ({checks} status checks)")]
    Timeout { limit_secs: u64, checks: u32 },

    /// Too many consecutive status checks failed.
    #[error("Status check failed {failures} times in a row: {last_error}")]
    StatusCheckFailed { failures: u32, last_error: String },

    /// The task was reset while work was in flight.
    #[error("Translation was cancelled")]
    Cancelled,

    /// Operation not valid in the session's current state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    // ── Local I/O ─────────────────────────────────────────────────────────
    /// Could not read the input or write an output file.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: PathBuf, detail: String },

    /// Downloading a result artefact failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } | Self::UnsupportedFileType { .. } | Self::EmptyFile { .. } => {
                ErrorKind::Validation
            }
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TransientProvider { .. } => ErrorKind::TransientProvider,
            Self::ProviderRejected { .. } => ErrorKind::ProviderRejected,
            Self::Terminated { .. } => ErrorKind::Terminated,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::StatusCheckFailed { .. } => ErrorKind::TransientProvider,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Io { .. } | Self::DownloadFailed { .. } => ErrorKind::Io,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same request may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientProvider { .. })
    }

    /// Map a `reqwest` transport error (no HTTP status) to a transient error.
    pub(crate) fn from_transport(err: &reqwest::Error, timeout_secs: u64) -> Self {
        let detail = if err.is_timeout() {
            format!("request timed out after {timeout_secs}s")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::TransientProvider { detail }
    }
}

fn format_mb(bytes: &u64) -> String {
    format!("{:.0} MB", *bytes as f64 / (1024.0 * 1024.0))
}

fn size_suffix(size: &Option<u64>) -> String {
    size.as_ref()
        .map(|s| format!(" File is {}.", format_mb(s)))
        .unwrap_or_default()
}
