//! HTTP client for the hosted translation API.
//!
//! Two endpoints, both authenticated with the raw key in `Authorization`:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create | `POST {base}/translation/create`, multipart: `file` + form fields |
//! | query  | `POST {base}/translation/query`, JSON `{"taskId": "…"}` |
//!
//! The file part is streamed from disk; the upload is never buffered in
//! memory as a whole.

use super::{parse_created, parse_status, CreatedTask, StatusResponse, TranslationProvider};
use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::pipeline::submit::SubmitParams;
use crate::pipeline::upload::PdfUpload;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Client for `otranslator.com`-compatible endpoints.
#[derive(Clone)]
pub struct OTranslatorClient {
    http: Client,
    base_url: String,
    api_key: String,
    submit_timeout: Duration,
    query_timeout: Duration,
}

impl std::fmt::Debug for OTranslatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OTranslatorClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OTranslatorClient {
    /// Build a client from `config`. Fails with `Auth` when no key is available.
    pub fn from_config(config: &TranslationConfig) -> Result<Self, TranslateError> {
        let api_key = config.resolved_api_key().ok_or_else(|| TranslateError::Auth {
            detail: "no API key configured".into(),
        })?;
        Self::new(
            &config.base_url,
            api_key,
            Duration::from_secs(config.submit_timeout_secs),
            Duration::from_secs(config.query_timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        submit_timeout: Duration,
        query_timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let http = Client::builder()
            .user_agent(concat!("edgequake-pdf-translate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslateError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            submit_timeout,
            query_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn file_part(&self, upload: &PdfUpload) -> Result<Part, TranslateError> {
        let file = tokio::fs::File::open(upload.path())
            .await
            .map_err(|e| TranslateError::Io {
                path: upload.path().to_path_buf(),
                detail: e.to_string(),
            })?;
        let body = Body::wrap_stream(ReaderStream::new(file));
        Part::stream_with_length(body, upload.size())
            .file_name(upload.file_name().to_string())
            .mime_str(upload.mime_type())
            .map_err(|e| TranslateError::Internal(format!("multipart: {e}")))
    }
}

/// Map a non-success create response onto the error taxonomy.
fn create_error(status: StatusCode, body: &str) -> TranslateError {
    let detail = error_detail(status, body);
    match status.as_u16() {
        401 | 403 => TranslateError::Auth { detail },
        413 => TranslateError::PayloadTooLarge {
            size: None,
            limit: crate::config::DEFAULT_MAX_FILE_SIZE,
        },
        429 | 500..=599 => TranslateError::TransientProvider { detail },
        code => TranslateError::ProviderRejected { status: code, detail },
    }
}

/// Map a non-success query response onto the error taxonomy.
fn query_error(status: StatusCode, body: &str, task_id: &str) -> TranslateError {
    let detail = error_detail(status, body);
    match status.as_u16() {
        401 | 403 => TranslateError::Auth { detail },
        404 => TranslateError::NotFound {
            task_id: task_id.to_string(),
        },
        429 | 500..=599 => TranslateError::TransientProvider { detail },
        code => TranslateError::ProviderRejected { status: code, detail },
    }
}

/// `message`/`error` from a JSON error body, else the status reason.
fn error_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
}

#[async_trait]
impl TranslationProvider for OTranslatorClient {
    fn name(&self) -> &str {
        "otranslator"
    }

    async fn create_task(
        &self,
        upload: &PdfUpload,
        params: &SubmitParams,
    ) -> Result<CreatedTask, TranslateError> {
        let mut form = Form::new().part("file", self.file_part(upload).await?);
        for (name, value) in params.form_fields() {
            form = form.text(name, value);
        }

        let timeout_secs = self.submit_timeout.as_secs();
        let resp = self
            .http
            .post(self.endpoint("translation/create"))
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .timeout(self.submit_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranslateError::from_transport(&e, timeout_secs))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TranslateError::from_transport(&e, timeout_secs))?;
        debug!("create → HTTP {} ({} bytes)", status.as_u16(), body.len());

        if !status.is_success() {
            return Err(create_error(status, &body));
        }
        parse_created(&body)
    }

    async fn query_task(&self, task_id: &str) -> Result<StatusResponse, TranslateError> {
        let timeout_secs = self.query_timeout.as_secs();
        let resp = self
            .http
            .post(self.endpoint("translation/query"))
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .timeout(self.query_timeout)
            .json(&serde_json::json!({ "taskId": task_id }))
            .send()
            .await
            .map_err(|e| TranslateError::from_transport(&e, timeout_secs))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TranslateError::from_transport(&e, timeout_secs))?;
        debug!("query {} → HTTP {}", task_id, status.as_u16());

        if !status.is_success() {
            return Err(query_error(status, &body, task_id));
        }
        parse_status(&body)
    }
}
