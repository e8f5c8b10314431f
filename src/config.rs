//! Configuration types for PDF translation jobs.
//!
//! All client behaviour is controlled through [`TranslationConfig`], built
//! via its [`TranslationConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them (the API key is
//! redacted), and diff two runs to understand why their outcomes differ.

use crate::error::TranslateError;
use crate::pipeline::poller::PollSchedule;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::submit::SubmitParams;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default provider endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://otranslator.com/api/v1";

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OTRANSLATOR_API_KEY";

/// Upload limit enforced locally before any network call (100 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Configuration for a translation job.
///
/// Built via [`TranslationConfig::builder()`] or using
/// [`TranslationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf_translate::TranslationConfig;
///
/// let config = TranslationConfig::builder()
///     .target_lang("de")
///     .model("gpt-4.1-mini")
///     .max_retries(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Provider API key. Falls back to `OTRANSLATOR_API_KEY` when `None`.
    pub api_key: Option<String>,

    /// Provider endpoint root. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Source language code, or `"auto"` for detection. Default: `"auto"`.
    pub source_lang: String,

    /// Target language code. Default: `"lt"`.
    pub target_lang: String,

    /// Provider model identifier. Default: `"grok-3-mini"`.
    pub model: String,

    /// Optional glossary forwarded verbatim to the provider.
    pub glossary: Option<String>,

    /// Ask the provider to translate text inside images. Not sent when `None`.
    pub translate_images: Option<bool>,

    /// Request a preview (partial) translation. Not sent when `None`.
    pub preview: Option<bool>,

    /// Largest file accepted for upload, in bytes. Default: 100 MB.
    pub max_file_size: u64,

    /// Timeout for the create (upload) request in seconds. Default: 30.
    pub submit_timeout_secs: u64,

    /// Timeout for a single status query in seconds. Default: 15.
    pub query_timeout_secs: u64,

    /// Attempts per status query before it counts as a failed check. Default: 3.
    pub max_retries: u32,

    /// Base delay between attempts in milliseconds. Default: 2000.
    ///
    /// With [`Backoff::Linear`] the wait before attempt `n + 1` is
    /// `retry_delay_ms * n`: 2 s, then 4 s.
    pub retry_delay_ms: u64,

    /// Backoff curve between query attempts. Default: [`Backoff::Linear`].
    pub backoff: Backoff,

    /// Interval escalation and global wait bound for status polling.
    pub schedule: PollSchedule,

    /// Consecutive failed status checks absorbed before the task errors. Default: 5.
    ///
    /// A long job can outlive a short provider outage. The sixth failure in a
    /// row fails the task; any success resets the count.
    pub failure_tolerance: u32,

    /// Use the in-process sandbox provider instead of the real API. Default: false.
    ///
    /// Sandbox tasks are synthetic and clearly labelled. The client never
    /// falls back to them on its own.
    pub sandbox: bool,

    /// Webhook returning `{"credits": <number>}`; refreshed after a completed job.
    pub credits_webhook_url: Option<String>,

    /// Optional observer for submission and polling events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            source_lang: "auto".to_string(),
            target_lang: "lt".to_string(),
            model: "grok-3-mini".to_string(),
            glossary: None,
            translate_images: None,
            preview: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            submit_timeout_secs: 30,
            query_timeout_secs: 15,
            max_retries: 3,
            retry_delay_ms: 2000,
            backoff: Backoff::default(),
            schedule: PollSchedule::default(),
            failure_tolerance: 5,
            sandbox: false,
            credits_webhook_url: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("model", &self.model)
            .field("glossary", &self.glossary.as_ref().map(|g| g.len()))
            .field("translate_images", &self.translate_images)
            .field("preview", &self.preview)
            .field("max_file_size", &self.max_file_size)
            .field("submit_timeout_secs", &self.submit_timeout_secs)
            .field("query_timeout_secs", &self.query_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("backoff", &self.backoff)
            .field("schedule", &self.schedule)
            .field("failure_tolerance", &self.failure_tolerance)
            .field("sandbox", &self.sandbox)
            .field("credits_webhook_url", &self.credits_webhook_url)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TranslationProgressCallback>"),
            )
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured API key, or the value of `OTRANSLATOR_API_KEY`.
    ///
    /// Empty strings and the `.env.example` placeholder count as missing.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty() && k != "your_actual_api_key_here")
    }

    /// Retry policy applied to each status query.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.retry_delay_ms),
            backoff: self.backoff,
        }
    }

    /// Submission parameters derived from the language/model settings.
    pub fn submit_params(&self) -> SubmitParams {
        SubmitParams {
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            model: self.model.clone(),
            glossary: self.glossary.clone(),
            translate_images: self.translate_images,
            preview: self.preview,
        }
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn source_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.source_lang = lang.into();
        self
    }

    pub fn target_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.target_lang = lang.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn glossary(mut self, glossary: impl Into<String>) -> Self {
        self.config.glossary = Some(glossary.into());
        self
    }

    pub fn translate_images(mut self, v: bool) -> Self {
        self.config.translate_images = Some(v);
        self
    }

    pub fn preview(mut self, v: bool) -> Self {
        self.config.preview = Some(v);
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn submit_timeout_secs(mut self, secs: u64) -> Self {
        self.config.submit_timeout_secs = secs.max(1);
        self
    }

    pub fn query_timeout_secs(mut self, secs: u64) -> Self {
        self.config.query_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.max(1);
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn schedule(mut self, schedule: PollSchedule) -> Self {
        self.config.schedule = schedule;
        self
    }

    pub fn max_wait(mut self, wait: Duration) -> Self {
        self.config.schedule.max_wait = wait;
        self
    }

    pub fn failure_tolerance(mut self, n: u32) -> Self {
        self.config.failure_tolerance = n;
        self
    }

    pub fn sandbox(mut self, v: bool) -> Self {
        self.config.sandbox = v;
        self
    }

    pub fn credits_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.config.credits_webhook_url = Some(url.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        if c.target_lang.trim().is_empty() {
            return Err(TranslateError::InvalidConfig(
                "target language must not be empty".into(),
            ));
        }
        if c.target_lang == "auto" {
            return Err(TranslateError::InvalidConfig(
                "target language cannot be 'auto'".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(TranslateError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_file_size == 0 {
            return Err(TranslateError::InvalidConfig(
                "max file size must be ≥ 1 byte".into(),
            ));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(TranslateError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        c.schedule.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Delay curve between attempts of one status query.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Backoff {
    /// `base * attempt`: 2 s, 4 s, 6 s … (default)
    #[default]
    Linear,
    /// `base * factor^(attempt-1)`, never longer than `cap_ms`.
    Multiplicative { factor: f64, cap_ms: u64 },
}

impl Backoff {
    /// The multiplicative variant: ×1.5 per attempt, capped at 10 s.
    pub fn multiplicative() -> Self {
        Backoff::Multiplicative {
            factor: 1.5,
            cap_ms: 10_000,
        }
    }
}
