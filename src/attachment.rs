//! Attachment operations for demands and responses
//!
//! The two attachment endpoints are structurally identical, differing only in
//! which id and URL segment they address, so one service covers both scopes.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use reqwest::Method;

use iserve_protocol::api::FileDescriptor;
use iserve_protocol::common::UploadedFile;

use crate::client::ApiClient;
use crate::error::Result;
use crate::upload::{ProgressSender, UploadPolicy, UploadSource};
use crate::utils::parse_content_disposition;

/// Which resource an attachment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentScope {
    Demand,
    Response,
}

impl AttachmentScope {
    pub fn segment(&self) -> &'static str {
        match self {
            AttachmentScope::Demand => "demands",
            AttachmentScope::Response => "responses",
        }
    }

    /// Filename used when the server provides none
    pub fn fallback_filename(&self, id: &str) -> String {
        match self {
            AttachmentScope::Demand => format!("demand_{}_file", id),
            AttachmentScope::Response => format!("response_{}_file", id),
        }
    }

    fn file_endpoint(&self, id: &str) -> String {
        format!("/{}/{}/file", self.segment(), id)
    }

    fn resource_endpoint(&self, id: &str) -> String {
        format!("/{}/{}/file/resource", self.segment(), id)
    }
}

impl fmt::Display for AttachmentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AttachmentScope::Demand => "demand",
            AttachmentScope::Response => "response",
        };
        f.pad(text)
    }
}

impl FromStr for AttachmentScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "demand" | "demands" => Ok(AttachmentScope::Demand),
            "response" | "responses" => Ok(AttachmentScope::Response),
            other => Err(format!("unknown attachment scope: {}", other)),
        }
    }
}

/// Result of fetching the latest attachment
#[derive(Debug, Clone)]
pub enum LatestFile {
    /// Metadata-only view, for existence checks and previews
    Descriptor(FileDescriptor),
    /// The raw file, for downloads
    Content {
        filename: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Attachment service for one resource scope
pub struct AttachmentService<'a, C: ApiClient + ?Sized> {
    client: &'a C,
    scope: AttachmentScope,
    policy: UploadPolicy,
}

impl<'a, C: ApiClient + ?Sized> AttachmentService<'a, C> {
    pub fn new(client: &'a C, scope: AttachmentScope) -> Self {
        Self {
            client,
            scope,
            policy: UploadPolicy::default(),
        }
    }

    pub fn with_policy(client: &'a C, scope: AttachmentScope, policy: UploadPolicy) -> Self {
        Self {
            client,
            scope,
            policy,
        }
    }

    /// Upload a new attachment
    ///
    /// The file is validated locally first; an invalid file never issues a
    /// request.
    pub async fn upload(
        &self,
        id: &str,
        path: &Path,
        progress: Option<ProgressSender>,
    ) -> Result<UploadedFile> {
        let source = UploadSource::prepare(path, &self.policy).await?;
        self.client
            .upload_file(Method::POST, &self.scope.file_endpoint(id), source, progress)
            .await
    }

    /// Replace the existing attachment
    pub async fn replace(
        &self,
        id: &str,
        path: &Path,
        progress: Option<ProgressSender>,
    ) -> Result<UploadedFile> {
        let source = UploadSource::prepare(path, &self.policy).await?;
        self.client
            .upload_file(Method::PUT, &self.scope.file_endpoint(id), source, progress)
            .await
    }

    /// Fetch the latest attachment
    ///
    /// The resource is always fetched as bytes. With `download == false` the
    /// bytes stay internal and the caller gets a metadata descriptor, reusing
    /// the same network call as a real download. A 404 means "no file" and
    /// yields `Ok(None)`; any other failure propagates.
    pub async fn get_latest(&self, id: &str, download: bool) -> Result<Option<LatestFile>> {
        let endpoint = self.scope.resource_endpoint(id);
        let query = vec![("download".to_string(), download.to_string())];

        let binary = match self.client.fetch_binary(&endpoint, &query).await {
            Ok(binary) => binary,
            Err(err) if err.status() == Some(404) => return Ok(None),
            Err(err) => return Err(err),
        };

        let filename = binary
            .content_disposition
            .as_deref()
            .and_then(parse_content_disposition)
            .unwrap_or_else(|| self.scope.fallback_filename(id));

        if download {
            Ok(Some(LatestFile::Content {
                filename,
                content_type: binary.content_type,
                bytes: binary.bytes,
            }))
        } else {
            Ok(Some(LatestFile::Descriptor(FileDescriptor {
                filename,
                size: binary.bytes.len() as u64,
                content_type: binary.content_type,
                last_modified: None,
                exists: true,
                url: format!("{}?download=true", endpoint),
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BinaryResponse;
    use crate::error::IserveError;
    use crate::tests::mocks::MockApiClient;
    use crate::tests::utils::test_helpers::*;
    use serde_json::json;

    fn setup() -> (tempfile::TempDir, MockApiClient) {
        let temp_dir = create_temp_dir();
        let config = test_client_config(&temp_dir);
        (temp_dir, MockApiClient::new(config))
    }

    fn uploaded_file_json() -> serde_json::Value {
        json!({
            "id": 12,
            "originalName": "photo.png",
            "mimeType": "image/png",
            "sizeBytes": 128,
            "relPath": "demands/1/photo.png",
            "url": "/demands/1/file/resource?download=true"
        })
    }

    #[tokio::test]
    async fn upload_posts_multipart_to_scope_endpoint() {
        let (temp_dir, client) = setup();
        let path = create_temp_file_with_content(&temp_dir, "photo.png", &[0u8; 128]);
        client.add_response("/demands/1/file", uploaded_file_json());

        let service = AttachmentService::new(&client, AttachmentScope::Demand);
        let uploaded = service.upload("1", &path, None).await.unwrap();
        assert_eq!(uploaded.id, 12);
        assert_eq!(uploaded.original_name, "photo.png");

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, reqwest::Method::POST);
        assert_eq!(requests[0].endpoint, "/demands/1/file");
        let source = requests[0].upload.as_ref().unwrap();
        assert_eq!(source.filename, "photo.png");
        assert_eq!(source.mime, "image/png");
    }

    #[tokio::test]
    async fn replace_uses_put_on_response_scope() {
        let (temp_dir, client) = setup();
        let path = create_temp_file_with_content(&temp_dir, "doc.pdf", &[0u8; 64]);
        client.add_response("/responses/4/file", uploaded_file_json());

        let service = AttachmentService::new(&client, AttachmentScope::Response);
        service.replace("4", &path, None).await.unwrap();

        let requests = client.get_requests();
        assert_eq!(requests[0].method, reqwest::Method::PUT);
        assert_eq!(requests[0].endpoint, "/responses/4/file");
    }

    #[tokio::test]
    async fn oversized_upload_never_issues_a_request() {
        let (temp_dir, client) = setup();
        let path = create_temp_file_with_content(&temp_dir, "big.bin", &[0u8; 2048]);

        let policy = UploadPolicy {
            accept: "*".to_string(),
            max_size: 1024,
        };
        let service = AttachmentService::with_policy(&client, AttachmentScope::Demand, policy);

        let err = service.upload("1", &path, None).await.unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
        assert!(client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn rejected_file_type_never_issues_a_request() {
        let (temp_dir, client) = setup();
        let path = create_temp_file_with_content(&temp_dir, "clip.mp4", &[0u8; 16]);

        let policy = UploadPolicy {
            accept: "image/*,.pdf".to_string(),
            max_size: 1024,
        };
        let service = AttachmentService::with_policy(&client, AttachmentScope::Demand, policy);

        let err = service.upload("1", &path, None).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
        assert!(client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn get_latest_descriptor_parses_content_disposition() {
        let (_tmp, client) = setup();
        client.add_binary(
            "/demands/1/file/resource",
            BinaryResponse {
                bytes: vec![0u8; 64],
                content_type: Some("application/pdf".to_string()),
                content_disposition: Some("attachment; filename=\"plan.pdf\"".to_string()),
            },
        );

        let service = AttachmentService::new(&client, AttachmentScope::Demand);
        let latest = service.get_latest("1", false).await.unwrap().unwrap();

        match latest {
            LatestFile::Descriptor(descriptor) => {
                assert_eq!(descriptor.filename, "plan.pdf");
                assert_eq!(descriptor.size, 64);
                assert!(descriptor.exists);
                assert_eq!(
                    descriptor.url,
                    "/demands/1/file/resource?download=true"
                );
            }
            other => panic!("expected descriptor, got {:?}", other),
        }

        let requests = client.get_requests();
        assert_eq!(
            requests[0].query,
            vec![("download".to_string(), "false".to_string())]
        );
    }

    #[tokio::test]
    async fn get_latest_falls_back_to_synthesized_filename() {
        let (_tmp, client) = setup();
        client.add_binary(
            "/responses/9/file/resource",
            BinaryResponse {
                bytes: vec![1, 2, 3],
                content_type: None,
                content_disposition: None,
            },
        );

        let service = AttachmentService::new(&client, AttachmentScope::Response);
        let latest = service.get_latest("9", false).await.unwrap().unwrap();

        match latest {
            LatestFile::Descriptor(descriptor) => {
                assert_eq!(descriptor.filename, "response_9_file");
            }
            other => panic!("expected descriptor, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_latest_download_returns_bytes() {
        let (_tmp, client) = setup();
        client.add_binary(
            "/demands/1/file/resource",
            BinaryResponse {
                bytes: vec![9, 9, 9],
                content_type: Some("image/png".to_string()),
                content_disposition: Some("attachment; filename=pic.png".to_string()),
            },
        );

        let service = AttachmentService::new(&client, AttachmentScope::Demand);
        let latest = service.get_latest("1", true).await.unwrap().unwrap();

        match latest {
            LatestFile::Content {
                filename, bytes, ..
            } => {
                assert_eq!(filename, "pic.png");
                assert_eq!(bytes, vec![9, 9, 9]);
            }
            other => panic!("expected content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_latest_treats_404_as_no_file() {
        let (_tmp, client) = setup();
        client.add_error(
            "/demands/1/file/resource",
            IserveError::api(404, "Requested resource does not exist"),
        );

        let service = AttachmentService::new(&client, AttachmentScope::Demand);
        assert!(service.get_latest("1", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_latest_propagates_other_failures() {
        let (_tmp, client) = setup();
        client.add_error(
            "/demands/1/file/resource",
            IserveError::api(500, "Internal server error"),
        );

        let service = AttachmentService::new(&client, AttachmentScope::Demand);
        let err = service.get_latest("1", false).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
