//! Input staging: turn a path, URL or byte buffer into a [`DocumentRef`].
//!
//! pdfium and Tesseract both want a file-system path, and the OCR fallback
//! reads the document more than once (page count, then one load per page).
//! Uploaded bytes and downloads are therefore written into a fresh
//! [`TempDir`] that the `DocumentRef` owns; dropping the reference removes
//! the directory, whichever way extraction ended. Local paths supplied by the
//! caller are borrowed and never deleted.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// What kind of document a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A PDF, text-native or scanned.
    Pdf,
    /// A raster image (photo or scan).
    Image,
}

impl DocumentKind {
    /// Map an upload's MIME type to a kind. Returns `None` for anything the
    /// pipeline does not accept; the front end must reject those uploads.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" | "application/x-pdf" => Some(DocumentKind::Pdf),
            "image/jpeg" | "image/jpg" | "image/png" | "image/tiff" | "image/bmp"
            | "image/webp" | "image/gif" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    /// Guess the kind from a file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "jpg" | "jpeg" | "png" | "tif" | "tiff" | "bmp" | "webp" | "gif" => {
                Some(DocumentKind::Image)
            }
            _ => None,
        }
    }

    /// Guess the kind from the first bytes of the file.
    pub fn sniff(head: &[u8]) -> Option<Self> {
        const IMAGE_MAGIC: &[&[u8]] = &[
            b"\x89PNG\r\n\x1a\n",
            b"\xff\xd8\xff",
            b"II*\0",
            b"MM\0*",
            b"BM",
            b"GIF87a",
            b"GIF89a",
        ];
        if head.starts_with(b"%PDF") {
            return Some(DocumentKind::Pdf);
        }
        if IMAGE_MAGIC.iter().any(|m| head.starts_with(m)) {
            return Some(DocumentKind::Image);
        }
        if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
            return Some(DocumentKind::Image);
        }
        None
    }

    fn default_extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "jpg",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pdf => f.write_str("pdf"),
            DocumentKind::Image => f.write_str("image"),
        }
    }
}

/// Handle to one document's bytes on disk, plus its declared kind.
///
/// A reference created by [`DocumentRef::stage_bytes`] or
/// [`resolve_input`] (for URLs) owns its staging directory; the directory
/// and everything in it is deleted when the reference is dropped.
#[derive(Debug)]
pub struct DocumentRef {
    path: PathBuf,
    kind: DocumentKind,
    staging: Option<TempDir>,
}

impl DocumentRef {
    /// Borrow a caller-owned file. Nothing is deleted on drop.
    pub fn from_path(path: impl Into<PathBuf>, kind: DocumentKind) -> Self {
        Self {
            path: path.into(),
            kind,
            staging: None,
        }
    }

    /// Write `bytes` into a fresh staging directory and reference the copy.
    ///
    /// `file_name` is reduced to its final component so an uploaded name can
    /// never escape the staging directory.
    pub async fn stage_bytes(
        bytes: &[u8],
        file_name: &str,
        kind: DocumentKind,
    ) -> Result<Self, ExtractError> {
        let staging = new_staging_dir()?;
        let path = staging.path().join(safe_file_name(file_name, kind));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| ExtractError::StagingFailed { source })?;
        debug!("Staged {} bytes at {}", bytes.len(), path.display());
        Ok(Self {
            path,
            kind,
            staging: Some(staging),
        })
    }

    /// Path to the document regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Whether dropping this reference deletes the underlying file.
    pub fn is_staged(&self) -> bool {
        self.staging.is_some()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to a [`DocumentRef`].
///
/// The kind is taken from `kind` when given, otherwise from the file
/// extension, otherwise from the leading bytes.
pub async fn resolve_input(
    input: &str,
    kind: Option<DocumentKind>,
    timeout_secs: u64,
) -> Result<DocumentRef, ExtractError> {
    if input.trim().is_empty() {
        return Err(ExtractError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, kind, timeout_secs).await
    } else {
        resolve_local(input, kind)
    }
}

/// Resolve a local file path, validating existence and readability.
fn resolve_local(path_str: &str, kind: Option<DocumentKind>) -> Result<DocumentRef, ExtractError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    let mut head = [0u8; 16];
    let read = match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            f.read(&mut head).unwrap_or(0)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound { path });
        }
    };

    let kind = kind
        .or_else(|| DocumentKind::from_extension(&path))
        .or_else(|| DocumentKind::sniff(&head[..read]))
        .ok_or_else(|| ExtractError::UnknownKind {
            input: path_str.to_string(),
        })?;

    debug!("Resolved local {} document: {}", kind, path.display());
    Ok(DocumentRef::from_path(path, kind))
}

/// Download a URL into a staging directory.
async fn download_url(
    url: &str,
    kind: Option<DocumentKind>,
    timeout_secs: u64,
) -> Result<DocumentRef, ExtractError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let mime_kind = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(DocumentKind::from_mime);
    let filename = filename_from_url(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let kind = kind
        .or_else(|| filename.as_deref().and_then(|f| DocumentKind::from_extension(Path::new(f))))
        .or(mime_kind)
        .or_else(|| DocumentKind::sniff(&bytes))
        .ok_or_else(|| ExtractError::UnknownKind {
            input: url.to_string(),
        })?;

    let doc = DocumentRef::stage_bytes(&bytes, filename.as_deref().unwrap_or(""), kind).await?;
    info!("Downloaded to: {}", doc.path().display());
    Ok(doc)
}

/// Last path segment of a URL if it looks like a file name.
fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if !last.is_empty() && last.contains('.') {
        Some(last.to_string())
    } else {
        None
    }
}

fn new_staging_dir() -> Result<TempDir, ExtractError> {
    tempfile::Builder::new()
        .prefix("ratecon-doc-")
        .tempdir()
        .map_err(|source| ExtractError::StagingFailed { source })
}

fn safe_file_name(file_name: &str, kind: DocumentKind) -> String {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("document.{}", kind.default_extension()))
}
