//! Result resolution: turn a `Completed` status response into a
//! [`TranslationResult`].
//!
//! The provider is loose about field types, so every artefact field is
//! coerced to text through [`coerce_to_string`]. A missing translated-file URL
//! does not fail the task; the result simply has no download link.

use crate::output::TranslationResult;
use crate::provider::StatusResponse;
use serde_json::Value;
use tracing::{info, warn};

/// Coerce a loosely-typed JSON value to display text.
///
/// | Input | Output |
/// |-------|--------|
/// | `null`, `""`, whitespace | `None` |
/// | string | trimmed string |
/// | number, bool | its literal form |
/// | array, object | compact JSON |
pub fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn field(value: &Option<Value>) -> Option<String> {
    value.as_ref().and_then(coerce_to_string)
}

/// Extract artefacts and usage from a completed status response.
pub fn resolve_completion(resp: &StatusResponse) -> TranslationResult {
    let result = TranslationResult {
        translated_file_url: field(&resp.translated_file_url),
        bilingual_file_url: field(&resp.translated_bilingual_file_url),
        used_credits: field(&resp.used_credits),
        token_count: field(&resp.token_count),
    };

    match result.download_url() {
        Some(url) => info!(
            "Translation complete: {} (credits: {}, tokens: {})",
            url,
            result.used_credits.as_deref().unwrap_or("?"),
            result.token_count.as_deref().unwrap_or("?")
        ),
        None => warn!("Provider reported completion without a translated file URL"),
    }
    result
}
