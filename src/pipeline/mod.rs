//! Pipeline stages for a translation job.
//!
//! Each submodule owns one step. The async driver that strings them together
//! is [`crate::session::TranslationSession`].
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ submit ──▶ poller ◀──▶ retry ──▶ resolver ──▶ download
//! (validate)  (create)   (schedule)  (query)   (result)     (optional)
//! ```
//!
//! 1. [`upload`]  : describe the PDF and validate size/type locally
//! 2. [`submit`]  : create the provider task; never retried automatically
//! 3. [`poller`]  : interval schedule, progress estimate, state transitions
//! 4. [`retry`]   : bounded backoff around a single status query
//! 5. [`resolver`]: extract artefacts from a `Completed` response
//! 6. [`download`]: fetch the translated file to disk

pub mod download;
pub mod poller;
pub mod resolver;
pub mod retry;
pub mod submit;
pub mod upload;
