//! File validation and upload preparation
//!
//! Attachments are validated locally before any request is constructed:
//! oversized files and files matching none of the accepted patterns never
//! reach the network layer. Upload progress is published as a stream of
//! 0-100 integers on a watch channel, which callers can subscribe to and
//! compose with cancellation.

use std::path::{Path, PathBuf};

use tokio::sync::watch;

use crate::error::{IserveError, Result};
use crate::utils::format_bytes;

/// Default attachment size cap (50 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Accept pattern matching every file
pub const ACCEPT_ANY: &str = "*";

/// Sending side of an upload progress stream
pub type ProgressSender = watch::Sender<u8>;
/// Receiving side of an upload progress stream; yields 0-100 percentages
pub type ProgressStream = watch::Receiver<u8>;

/// Create a progress stream starting at zero
pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    watch::channel(0)
}

/// What an attachment endpoint accepts
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Comma-separated accept patterns: extensions (`.pdf`), exact MIME
    /// types (`application/pdf`), or family wildcards (`image/*`)
    pub accept: String,
    pub max_size: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            accept: ACCEPT_ANY.to_string(),
            max_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Check a file against an accept pattern list and size cap
pub fn validate(name: &str, size: u64, mime: &str, accept: &str, max_size: u64) -> Result<()> {
    if size > max_size {
        return Err(IserveError::file_too_large(format!(
            "File size must not exceed {}",
            format_bytes(max_size)
        )));
    }

    if accept.trim() == ACCEPT_ANY {
        return Ok(());
    }

    let name_lower = name.to_ascii_lowercase();
    let matched = accept.split(',').map(str::trim).any(|pattern| {
        if pattern.is_empty() {
            false
        } else if let Some(ext) = pattern.strip_prefix('.') {
            name_lower.ends_with(&format!(".{}", ext.to_ascii_lowercase()))
        } else if let Some(family) = pattern.strip_suffix("/*") {
            mime.starts_with(&format!("{}/", family))
        } else {
            mime == pattern
        }
    });

    if matched {
        Ok(())
    } else {
        Err(IserveError::unsupported_file_type(format!(
            "Unsupported file type: {}",
            name
        )))
    }
}

/// A local file prepared for upload
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub path: PathBuf,
    pub filename: String,
    pub mime: String,
    pub size: u64,
}

impl UploadSource {
    /// Inspect and validate a local file against an upload policy
    pub async fn prepare(path: &Path, policy: &UploadPolicy) -> Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| IserveError::file_not_found(path.display().to_string()))?;

        if !metadata.is_file() {
            return Err(IserveError::invalid_input(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        validate(&filename, metadata.len(), &mime, &policy.accept, policy.max_size)?;

        Ok(Self {
            path: path.to_path_buf(),
            filename,
            mime,
            size: metadata.len(),
        })
    }
}
