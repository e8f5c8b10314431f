//! Task submission: validate the upload locally, then hand it to the provider.
//!
//! Submission is never retried automatically. A transient failure here is
//! returned to the caller, who may resubmit; repeating an upload silently
//! could create duplicate (billed) tasks on the provider side.

use crate::error::TranslateError;
use crate::pipeline::upload::PdfUpload;
use crate::provider::{CreatedTask, TranslationProvider};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Parameters fixed at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitParams {
    pub source_lang: String,
    pub target_lang: String,
    pub model: String,
    pub glossary: Option<String>,
    pub translate_images: Option<bool>,
    pub preview: Option<bool>,
}

impl Default for SubmitParams {
    fn default() -> Self {
        Self {
            source_lang: "auto".to_string(),
            target_lang: "lt".to_string(),
            model: "grok-3-mini".to_string(),
            glossary: None,
            translate_images: None,
            preview: None,
        }
    }
}

impl SubmitParams {
    /// Text fields of the multipart create request, in wire order.
    /// Optional flags are omitted when unset.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("fromLang", self.source_lang.clone()),
            ("toLang", self.target_lang.clone()),
            ("model", self.model.clone()),
        ];
        if let Some(ref g) = self.glossary {
            fields.push(("glossary", g.clone()));
        }
        if let Some(v) = self.translate_images {
            fields.push(("shouldTranslateImage", v.to_string()));
        }
        if let Some(v) = self.preview {
            fields.push(("preview", v.to_string()));
        }
        fields
    }
}

/// Validate `upload` and create a task on `provider`.
///
/// Validation errors are returned before the provider is contacted.
pub async fn submit(
    provider: &dyn TranslationProvider,
    upload: &PdfUpload,
    params: &SubmitParams,
    max_file_size: u64,
) -> Result<CreatedTask, TranslateError> {
    upload.validate(max_file_size)?;

    info!(
        "Submitting '{}' ({} bytes) to {}: {} → {} using {}",
        upload.file_name(),
        upload.size(),
        provider.name(),
        params.source_lang,
        params.target_lang,
        params.model
    );

    let start = Instant::now();
    match provider.create_task(upload, params).await {
        Ok(created) => {
            info!(
                "Task {} created in {}ms{}",
                created.task_id,
                start.elapsed().as_millis(),
                created
                    .message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default()
            );
            Ok(created)
        }
        Err(e) => {
            warn!("Submission of '{}' failed: {}", upload.file_name(), e);
            Err(e)
        }
    }
}
