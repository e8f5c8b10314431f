//! Pull-style task updates.
//!
//! [`watch_task`] turns a session's state channel into a `Stream` of task
//! snapshots, the pull-based counterpart of
//! [`crate::progress::TranslationProgressCallback`]. The stream ends after
//! it yields a terminal snapshot, or when the session is reset.
//!
//! Snapshots are coalesced: a slow consumer sees the latest state, not every
//! intermediate one.
//!
//! # Example
//! ```rust,no_run
//! use edgequake_pdf_translate::{watch_task, TranslationConfig, TranslationSession};
//! use edgequake_pdf_translate::pipeline::upload::PdfUpload;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranslationConfig::builder().sandbox(true).build()?;
//! let session = Arc::new(TranslationSession::from_config(config)?);
//! let upload = PdfUpload::from_path("document.pdf")?;
//!
//! let mut updates = watch_task(&session);
//! let runner = {
//!     let session = Arc::clone(&session);
//!     tokio::spawn(async move { session.run(&upload).await })
//! };
//! while let Some(task) = updates.next().await {
//!     println!("{}: {}%", task.status.as_str(), task.progress);
//! }
//! runner.await??;
//! # Ok(())
//! # }
//! ```

use crate::session::TranslationSession;
use crate::task::TranslationTask;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;

/// A boxed stream of task snapshots.
pub type TaskStream = Pin<Box<dyn Stream<Item = TranslationTask> + Send>>;

/// Stream snapshots of `session`'s task until it reaches a terminal state.
///
/// Idle states before the first submission are skipped. If the session is
/// reset after a task was seen, the stream ends.
pub fn watch_task(session: &TranslationSession) -> TaskStream {
    let updates = WatchStream::new(session.subscribe());
    let s = stream::unfold(
        (Box::pin(updates), false, false),
        |(mut updates, seen, done)| async move {
            if done {
                return None;
            }
            loop {
                match updates.next().await? {
                    Some(task) => {
                        let terminal = task.is_terminal();
                        return Some((task, (updates, true, terminal)));
                    }
                    None if seen => return None,
                    None => continue,
                }
            }
        },
    );
    Box::pin(s)
}
