//! Progress-callback trait for translation job events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to receive
//! events as the session submits the file and polls the provider.
//!
//! Callers can forward events to a channel, a WebSocket, or a terminal
//! progress bar without the library knowing how the host application
//! communicates. For a pull-style alternative see [`crate::stream::watch_task`].
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf_translate::{TranslationProgressCallback, TranslationConfig};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct CheckCounter {
//!     checks: AtomicU32,
//! }
//!
//! impl TranslationProgressCallback for CheckCounter {
//!     fn on_status_check(&self, check: u32, progress: u8) {
//!         self.checks.store(check, Ordering::SeqCst);
//!         eprintln!("check #{check}: {progress}%");
//!     }
//! }
//!
//! let counter = Arc::new(CheckCounter { checks: AtomicU32::new(0) });
//!
//! let config = TranslationConfig::builder()
//!     .progress_callback(counter as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::TranslationResult;
use std::sync::Arc;
use std::time::Duration;

/// Called by the session as a translation job advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one task arrive in order; the trait is
/// `Send + Sync` because the poll loop may run on any runtime worker.
pub trait TranslationProgressCallback: Send + Sync {
    /// The file passed local validation and the upload is starting.
    fn on_upload_start(&self, file_name: &str, size: u64) {
        let _ = (file_name, size);
    }

    /// The provider accepted the upload and assigned `task_id`.
    fn on_submitted(&self, task_id: &str) {
        let _ = task_id;
    }

    /// A status check succeeded and the task is still running.
    ///
    /// # Arguments
    /// * `check`   : 1-indexed check number
    /// * `progress`: reported or estimated progress, 0–99
    fn on_status_check(&self, check: u32, progress: u8) {
        let _ = (check, progress);
    }

    /// The poll interval changed at a schedule threshold.
    fn on_interval_changed(&self, from: Duration, to: Duration) {
        let _ = (from, to);
    }

    /// A status check failed after all retries; polling continues.
    ///
    /// # Arguments
    /// * `consecutive`: failed checks in a row, including this one
    /// * `error`      : human-readable error description
    fn on_check_failed(&self, consecutive: u32, error: &str) {
        let _ = (consecutive, error);
    }

    /// The provider reported `Completed`.
    fn on_completed(&self, result: &TranslationResult) {
        let _ = result;
    }

    /// The task reached the error state (submission failure, provider
    /// termination, timeout, or sustained status-check failure).
    fn on_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;
