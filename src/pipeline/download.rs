//! Artefact download: fetch a translated PDF to a local path.
//!
//! The body is streamed into a temp file created next to the destination and
//! renamed into place only after the last chunk is written, so a failed or
//! interrupted download never leaves a truncated file at `dest`.

use crate::error::TranslateError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// A file written by [`download_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Last path segment of `url` if it looks like a file name.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty() && last.contains('.')).then(|| last.to_string())
}

/// Download `url` to `dest`, replacing any existing file atomically.
pub async fn download_to(
    url: &str,
    dest: &Path,
    timeout_secs: u64,
) -> Result<DownloadedFile, TranslateError> {
    let failed = |reason: String| TranslateError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    info!("Downloading {} → {}", url, dest.display());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let io_err = |e: std::io::Error| TranslateError::Io {
        path: dest.to_path_buf(),
        detail: e.to_string(),
    };
    tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;

    let tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    let mut out = tokio::fs::File::from_std(tmp.reopen().map_err(io_err)?);

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
        out.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }
    out.flush().await.map_err(io_err)?;
    out.sync_all().await.map_err(io_err)?;
    drop(out);

    tmp.persist(dest).map_err(|e| io_err(e.error))?;
    debug!("Wrote {} bytes to {}", written, dest.display());

    Ok(DownloadedFile {
        path: dest.to_path_buf(),
        bytes: written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_url_uses_last_segment() {
        assert_eq!(
            file_name_from_url("https://cdn.example.com/out/report_lt.pdf?sig=abc").as_deref(),
            Some("report_lt.pdf")
        );
        assert_eq!(file_name_from_url("https://cdn.example.com/out/"), None);
        assert_eq!(file_name_from_url("https://cdn.example.com/download"), None);
        assert_eq!(file_name_from_url("not a url"), None);
    }
}
