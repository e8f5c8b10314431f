//! # edgequake-pdf-translate
//!
//! Submit PDF documents to a hosted translation API and track each job to
//! completion.
//!
//! ## Why this crate?
//!
//! Document translation services work asynchronously: you upload a file, get
//! a task id, and poll until the job finishes minutes later. The polling is
//! where clients go wrong. They hammer the API, give up on the first 502, or
//! spin forever on a task that was terminated. This crate validates uploads
//! locally, polls on an escalating schedule, absorbs short provider outages,
//! and enforces a global deadline.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload    validate size (≤ 100 MB) and type locally
//!  ├─ 2. Submit    multipart create request → task id
//!  ├─ 3. Poll      3 s ×3, 10 s ×9, then 20 s; 20 min deadline
//!  │     └─ Retry  up to 3 attempts per status query, transient errors only
//!  ├─ 4. Resolve   translated / bilingual URLs, credits, tokens
//!  └─ 5. Download  optional, atomic write to disk
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_translate::{translate, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from OTRANSLATOR_API_KEY
//!     let config = TranslationConfig::builder().target_lang("lt").build()?;
//!     let output = translate("document.pdf", &config).await?;
//!     println!("{}", output.result.download_label());
//!     eprintln!("{} status checks", output.stats.status_checks);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-translate` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf-translate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod credits;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod session;
pub mod stream;
pub mod task;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Backoff, TranslationConfig, TranslationConfigBuilder};
pub use credits::{fetch_credit_balance, CreditBalance};
pub use error::{ErrorKind, TranslateError};
pub use output::{TranslationOutput, TranslationResult, TranslationStats};
pub use pipeline::poller::PollSchedule;
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use provider::{ProviderStatus, TranslationProvider};
pub use session::TranslationSession;
pub use stream::watch_task;
pub use task::{TaskStatus, TranslationTask};
pub use translate::{
    check_status, download_file, resume, translate, translate_bytes, translate_sync,
    translate_to_file,
};
