//! Session behaviour against a scripted in-memory provider.
//!
//! Every test runs with the tokio clock paused, so the 3 s / 10 s / 20 s
//! schedule and the 20-minute deadline execute instantly and elapsed times
//! are exact.

use async_trait::async_trait;
use edgequake_pdf_translate::pipeline::submit::SubmitParams;
use edgequake_pdf_translate::pipeline::upload::PdfUpload;
use edgequake_pdf_translate::provider::{CreatedTask, StatusResponse};
use edgequake_pdf_translate::translate::{resume_with, translate_with};
use edgequake_pdf_translate::{
    ProgressCallback, TaskStatus, TranslateError, TranslationConfig, TranslationProgressCallback,
    TranslationProvider, TranslationResult, TranslationSession,
};
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

// ── Test helpers ─────────────────────────────────────────────────────────────

type Reply = Result<StatusResponse, TranslateError>;

/// Replays queued status replies, then repeats `fallback` forever.
struct ScriptedProvider {
    task_id: String,
    create_error: Option<TranslateError>,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    query_delay: Option<Duration>,
    creates: AtomicU32,
    queries: AtomicU32,
}

impl ScriptedProvider {
    fn new(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            create_error: None,
            replies: Mutex::new(VecDeque::new()),
            fallback: Ok(StatusResponse::processing(None)),
            query_delay: None,
            creates: AtomicU32::new(0),
            queries: AtomicU32::new(0),
        }
    }

    fn then(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn then_n(self, n: usize, reply: Reply) -> Self {
        (0..n).fold(self, |p, _| p.then(reply.clone()))
    }

    fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_task(
        &self,
        _upload: &PdfUpload,
        _params: &SubmitParams,
    ) -> Result<CreatedTask, TranslateError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(ref e) = self.create_error {
            return Err(e.clone());
        }
        Ok(CreatedTask {
            task_id: self.task_id.clone(),
            message: None,
        })
    }

    async fn query_task(&self, _task_id: &str) -> Result<StatusResponse, TranslateError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.query_delay {
            tokio::time::sleep(d).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<u8>>,
    intervals: Mutex<Vec<(u64, u64)>>,
    failures: Mutex<Vec<u32>>,
    completed: AtomicU32,
}

impl TranslationProgressCallback for Recorder {
    fn on_status_check(&self, _check: u32, progress: u8) {
        self.progress.lock().unwrap().push(progress);
    }

    fn on_interval_changed(&self, from: Duration, to: Duration) {
        self.intervals
            .lock()
            .unwrap()
            .push((from.as_secs(), to.as_secs()));
    }

    fn on_check_failed(&self, consecutive: u32, _error: &str) {
        self.failures.lock().unwrap().push(consecutive);
    }

    fn on_completed(&self, _result: &TranslationResult) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

fn transient() -> Reply {
    Err(TranslateError::TransientProvider {
        detail: "connection reset by peer".into(),
    })
}

fn config_with(recorder: &Arc<Recorder>) -> TranslationConfig {
    TranslationConfig::builder()
        .progress_callback(recorder.clone() as ProgressCallback)
        .build()
        .unwrap()
}

/// A file that starts with the PDF magic and is `size` bytes long (sparse).
fn pdf_file(dir: &TempDir, name: &str, size: u64) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(b"%PDF-1.7\n").unwrap();
    f.set_len(size).unwrap();
    path
}

// ── Local validation ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn oversize_file_fails_before_any_network_call() {
    let dir = TempDir::new().unwrap();
    let path = pdf_file(&dir, "big.pdf", 100 * 1024 * 1024 + 1);
    let provider = Arc::new(ScriptedProvider::new("never"));
    let upload = PdfUpload::from_path(&path).unwrap();

    let err = translate_with(provider.clone(), &upload, &TranslationConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::PayloadTooLarge { size: Some(_), .. }), "{err:?}");
    assert_eq!(provider.creates(), 0);
    assert_eq!(provider.queries(), 0);
}

#[tokio::test(start_paused = true)]
async fn non_pdf_fails_before_any_network_call() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, b"just some text, not a PDF").unwrap();
    let provider = Arc::new(ScriptedProvider::new("never"));
    let session = TranslationSession::new(provider.clone(), TranslationConfig::default());

    let upload = PdfUpload::from_path(&path).unwrap();
    let err = session.submit(&upload).await.unwrap_err();

    assert!(matches!(err, TranslateError::UnsupportedFileType { .. }));
    assert_eq!(provider.creates(), 0);
    let task = session.snapshot().unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert!(task.error.unwrap().message.contains("PDF"));
}

#[tokio::test(start_paused = true)]
async fn submission_failure_is_not_retried() {
    let mut provider = ScriptedProvider::new("x");
    provider.create_error = Some(TranslateError::TransientProvider {
        detail: "HTTP 503".into(),
    });
    let provider = Arc::new(provider);
    let session = TranslationSession::new(provider.clone(), TranslationConfig::default());
    let upload = PdfUpload::from_bytes(b"%PDF-1.4 body", "doc.pdf").unwrap();

    assert!(session.submit(&upload).await.unwrap_err().is_transient());
    assert_eq!(provider.creates(), 1);
    assert_eq!(session.status(), TaskStatus::Error);
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn three_processing_polls_then_completed() {
    let dir = TempDir::new().unwrap();
    let path = pdf_file(&dir, "report.pdf", 2 * 1024 * 1024);
    let provider = Arc::new(
        ScriptedProvider::new("abc-123")
            .then_n(3, Ok(StatusResponse::processing(None)))
            .then(Ok(StatusResponse::completed("https://x/y.pdf"))),
    );
    let recorder = Arc::new(Recorder::default());
    let upload = PdfUpload::from_path(&path).unwrap();

    let started = Instant::now();
    let output = translate_with(provider.clone(), &upload, &config_with(&recorder))
        .await
        .unwrap();

    assert_eq!(output.task.task_id, "abc-123");
    assert_eq!(output.task.source_language, "auto");
    assert_eq!(output.task.target_language, "lt");
    assert_eq!(output.task.status, TaskStatus::Completed);
    assert_eq!(output.task.progress, 100);
    assert_eq!(output.result.download_url(), Some("https://x/y.pdf"));
    assert_eq!(*recorder.progress.lock().unwrap(), vec![4, 8, 12]);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
    assert_eq!(output.stats.status_checks, 4);
    // 3 s before each of checks 1-3, 10 s before check 4.
    assert_eq!(started.elapsed(), Duration::from_secs(19));
}

#[tokio::test(start_paused = true)]
async fn interval_escalates_at_checks_4_and_13() {
    let provider = Arc::new(
        ScriptedProvider::new("abc-123")
            .then_n(13, Ok(StatusResponse::processing(Some(50))))
            .then(Ok(StatusResponse::completed("https://x/y.pdf"))),
    );
    let recorder = Arc::new(Recorder::default());
    let session = TranslationSession::new(provider, config_with(&recorder));
    session.attach("abc-123").unwrap();

    let started = Instant::now();
    session.poll().await.unwrap();

    assert_eq!(*recorder.intervals.lock().unwrap(), vec![(3, 10), (10, 20)]);
    // 3×3 s + 9×10 s + 2×20 s
    assert_eq!(started.elapsed(), Duration::from_secs(139));
    assert_eq!(session.snapshot().unwrap().check_count, 14);
}

#[tokio::test(start_paused = true)]
async fn resume_polls_existing_task_without_upload() {
    let provider = Arc::new(
        ScriptedProvider::new("unused").then(Ok(StatusResponse::completed("https://x/z.pdf"))),
    );
    let output = resume_with(provider.clone(), "abc-123", &TranslationConfig::default())
        .await
        .unwrap();
    assert_eq!(output.task.task_id, "abc-123");
    assert_eq!(output.result.download_url(), Some("https://x/z.pdf"));
    assert_eq!(provider.creates(), 0);
}

// ── Retries and failed checks ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn query_succeeds_on_third_attempt_without_failed_check() {
    let provider = Arc::new(
        ScriptedProvider::new("abc-123")
            .then(transient())
            .then(transient())
            .then(Ok(StatusResponse::completed("https://x/y.pdf"))),
    );
    let recorder = Arc::new(Recorder::default());
    let session = TranslationSession::new(provider.clone(), config_with(&recorder));
    session.attach("abc-123").unwrap();

    let started = Instant::now();
    let result = session.poll().await.unwrap();

    assert_eq!(result.download_url(), Some("https://x/y.pdf"));
    let task = session.snapshot().unwrap();
    assert_eq!(task.failed_checks, 0);
    assert_eq!(task.check_count, 1);
    assert!(recorder.failures.lock().unwrap().is_empty());
    assert_eq!(provider.queries(), 3);
    // 3 s poll wait, then 2 s and 4 s retry backoff.
    assert_eq!(started.elapsed(), Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn five_failed_checks_are_absorbed() {
    // Each failed check consumes three attempts.
    let provider = Arc::new(
        ScriptedProvider::new("abc-123")
            .then_n(5 * 3, transient())
            .then(Ok(StatusResponse::completed("https://x/y.pdf"))),
    );
    let recorder = Arc::new(Recorder::default());
    let session = TranslationSession::new(provider, config_with(&recorder));
    session.attach("abc-123").unwrap();

    session.poll().await.unwrap();

    let task = session.snapshot().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.failed_checks, 5);
    assert_eq!(task.consecutive_failures, 0);
    assert_eq!(*recorder.failures.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn sixth_consecutive_failed_check_errors() {
    let provider = Arc::new(ScriptedProvider::new("abc-123").otherwise(transient()));
    let session = TranslationSession::new(provider.clone(), TranslationConfig::default());
    session.attach("abc-123").unwrap();

    let err = session.poll().await.unwrap_err();

    assert!(
        matches!(err, TranslateError::StatusCheckFailed { failures: 6, .. }),
        "{err:?}"
    );
    assert!(err.to_string().contains("connection reset"));
    let task = session.snapshot().unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert_eq!(task.check_count, 6);
    assert_eq!(provider.queries(), 18);
}

#[tokio::test(start_paused = true)]
async fn unknown_task_fails_on_first_check() {
    let provider = Arc::new(ScriptedProvider::new("abc-123").otherwise(Err(
        TranslateError::NotFound {
            task_id: "abc-123".into(),
        },
    )));
    let session = TranslationSession::new(provider.clone(), TranslationConfig::default());
    session.attach("abc-123").unwrap();

    let err = session.poll().await.unwrap_err();
    assert!(matches!(err, TranslateError::NotFound { .. }));
    assert_eq!(provider.queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn terminated_task_reports_provider_message() {
    let provider = Arc::new(
        ScriptedProvider::new("abc-123")
            .then(Ok(StatusResponse::processing(None)))
            .then(Ok(StatusResponse::terminated("insufficient credits"))),
    );
    let session = TranslationSession::new(provider, TranslationConfig::default());
    session.attach("abc-123").unwrap();

    let err = session.poll().await.unwrap_err();
    assert!(matches!(err, TranslateError::Terminated { ref message } if message == "insufficient credits"));
    assert_eq!(session.status(), TaskStatus::Error);
}

// ── Deadline ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn times_out_after_twenty_minutes() {
    let provider = Arc::new(ScriptedProvider::new("abc-123"));
    let session = TranslationSession::new(provider, TranslationConfig::default());
    session.attach("abc-123").unwrap();

    let started = Instant::now();
    let err = session.poll().await.unwrap_err();

    // Checks 13..=67 run every 20 s up to 1199 s; the last wait is cut to 1 s.
    assert!(matches!(err, TranslateError::Timeout { limit_secs: 1200, checks: 68 }), "{err:?}");
    assert_eq!(started.elapsed(), Duration::from_secs(20 * 60));
    let task = session.snapshot().unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert!(task.progress <= 95);
}

#[tokio::test(start_paused = true)]
async fn shorter_deadline_is_honoured() {
    let provider = Arc::new(ScriptedProvider::new("abc-123"));
    let config = TranslationConfig::builder()
        .max_wait(Duration::from_secs(60))
        .build()
        .unwrap();
    let session = TranslationSession::new(provider, config);
    session.attach("abc-123").unwrap();

    let err = session.poll().await.unwrap_err();
    // ceil(60 s / 10 s) = 6 checks
    assert!(matches!(err, TranslateError::Timeout { limit_secs: 60, checks: 6 }), "{err:?}");
}

// ── Cancellation and concurrency ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn reset_mid_poll_discards_late_response() {
    let mut provider = ScriptedProvider::new("abc-123")
        .then(Ok(StatusResponse::completed("https://x/late.pdf")));
    provider.query_delay = Some(Duration::from_secs(5));
    let provider = Arc::new(provider);
    let session = Arc::new(TranslationSession::new(
        provider.clone(),
        TranslationConfig::default(),
    ));
    session.attach("abc-123").unwrap();

    let poller = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.poll().await })
    };

    // First check starts at 3 s and would answer at 8 s.
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(provider.queries(), 1);
    session.reset();

    let outcome = poller.await.unwrap();
    assert!(matches!(outcome, Err(TranslateError::Cancelled)));
    assert_eq!(session.status(), TaskStatus::Idle);

    session.attach("def-456").unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    let task = session.snapshot().unwrap();
    assert_eq!(task.task_id, "def-456");
    assert_eq!(task.check_count, 0);
    assert!(task.result.is_none());
}

#[tokio::test(start_paused = true)]
async fn second_concurrent_poll_is_rejected() {
    let provider = Arc::new(ScriptedProvider::new("abc-123"));
    let session = Arc::new(TranslationSession::new(provider, TranslationConfig::default()));
    session.attach("abc-123").unwrap();

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.poll().await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(matches!(session.poll().await, Err(TranslateError::InvalidState(_))));

    session.reset();
    assert!(matches!(first.await.unwrap(), Err(TranslateError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn submit_rejected_while_task_in_flight() {
    let provider = Arc::new(ScriptedProvider::new("abc-123"));
    let session = TranslationSession::new(provider.clone(), TranslationConfig::default());
    let upload = PdfUpload::from_bytes(b"%PDF-1.4 body", "doc.pdf").unwrap();

    assert_eq!(session.submit(&upload).await.unwrap(), "abc-123");
    assert!(matches!(
        session.submit(&upload).await,
        Err(TranslateError::InvalidState(_))
    ));
    assert_eq!(provider.creates(), 1);
}
