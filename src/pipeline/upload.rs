//! Upload preparation: describe a local PDF and validate it before any
//! network call.
//!
//! The MIME type is sniffed from the `%PDF-` magic bytes rather than trusted
//! from the file extension; a caller that received the file over HTTP can
//! override it with the declared type via [`PdfUpload::with_declared_mime`].
//!
//! In-memory uploads are spooled into a [`NamedTempFile`] owned by the
//! [`PdfUpload`]. The file is removed when the upload value is dropped, which
//! covers success, provider errors, cancellation, and panics alike.

use crate::error::TranslateError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// The only MIME type the provider accepts.
pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// A PDF ready to be streamed to the provider.
#[derive(Debug)]
pub struct PdfUpload {
    path: PathBuf,
    file_name: String,
    mime_type: String,
    size: u64,
    /// Keeps a spooled copy alive until the upload is dropped.
    _spool: Option<NamedTempFile>,
}

impl PdfUpload {
    /// Describe a file on disk. Fails only if the file cannot be read;
    /// call [`validate`](Self::validate) to check size and type.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TranslateError> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TranslateError::FileNotFound { path: path.clone() },
            _ => io_error(&path, &e),
        })?;
        if !meta.is_file() {
            return Err(TranslateError::FileNotFound { path });
        }

        let mut head = [0u8; 5];
        let read = std::fs::File::open(&path)
            .and_then(|mut f| read_prefix(&mut f, &mut head))
            .map_err(|e| io_error(&path, &e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        debug!("Prepared upload {} ({} bytes)", path.display(), meta.len());
        Ok(Self {
            mime_type: sniff_mime(&head[..read]).to_string(),
            path,
            file_name,
            size: meta.len(),
            _spool: None,
        })
    }

    /// Spool in-memory bytes to a managed temp file and describe it.
    pub fn from_bytes(bytes: &[u8], file_name: impl Into<String>) -> Result<Self, TranslateError> {
        let mut spool = NamedTempFile::new()
            .map_err(|e| TranslateError::Internal(format!("tempfile: {e}")))?;
        spool
            .write_all(bytes)
            .and_then(|_| spool.flush())
            .map_err(|e| io_error(spool.path(), &e))?;

        Ok(Self {
            path: spool.path().to_path_buf(),
            file_name: file_name.into(),
            mime_type: sniff_mime(bytes).to_string(),
            size: bytes.len() as u64,
            _spool: Some(spool),
        })
    }

    /// Replace the sniffed MIME type with one declared by the sender.
    pub fn with_declared_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = mime.into();
        self
    }

    /// Check size, then type, then emptiness. Never touches the network.
    pub fn validate(&self, max_size: u64) -> Result<(), TranslateError> {
        if self.size > max_size {
            return Err(TranslateError::PayloadTooLarge {
                size: Some(self.size),
                limit: max_size,
            });
        }
        if normalise_mime(&self.mime_type) != PDF_MIME {
            return Err(TranslateError::UnsupportedFileType {
                mime_type: self.mime_type.clone(),
            });
        }
        if self.size == 0 {
            return Err(TranslateError::EmptyFile {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the bytes live in a temp file owned by this upload.
    pub fn is_spooled(&self) -> bool {
        self._spool.is_some()
    }
}

fn read_prefix(f: &mut std::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match f.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn sniff_mime(head: &[u8]) -> &'static str {
    if head.starts_with(PDF_MAGIC) {
        PDF_MIME
    } else {
        "application/octet-stream"
    }
}

/// `Application/PDF; charset=binary` → `application/pdf`
fn normalise_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

fn io_error(path: &Path, e: &std::io::Error) -> TranslateError {
    TranslateError::Io {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}
