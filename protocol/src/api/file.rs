//! Attachment API DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::common::UploadedFile;

/// Metadata-only view of a stored attachment
///
/// Returned by existence/preview lookups that fetch the attachment resource
/// without handing the raw bytes to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub filename: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub exists: bool,
    pub url: String,
}
