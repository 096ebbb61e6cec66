//! HTTP client implementation for the iServe SDK
//!
//! Every resource module builds requests through the [`ApiClient`] trait; the
//! real [`HttpClient`] attaches the bearer token read from persisted session
//! storage, decodes successful responses directly to the caller's payload
//! type, and maps failure statuses to user-facing errors.

use std::path::Path;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{multipart, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use iserve_protocol::common::UploadedFile;

use crate::config::ClientConfig;
use crate::error::{IserveError, Result};
use crate::upload::{ProgressSender, UploadSource};

/// Binary payload plus the response headers the client cares about
#[derive(Debug, Clone)]
pub struct BinaryResponse {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// Request surface shared by the real client and the test mock
pub trait ApiClient {
    fn config(&self) -> &ClientConfig;

    /// Issue a request with an optional JSON body, decoding the payload
    async fn request<T, R>(&self, method: Method, endpoint: &str, payload: Option<&T>) -> Result<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned;

    /// Issue a request carrying only query parameters
    async fn request_query<R>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<R>
    where
        R: DeserializeOwned;

    /// Stream a single file as a multipart body under field name `file`
    async fn upload_file(
        &self,
        method: Method,
        endpoint: &str,
        source: UploadSource,
        progress: Option<ProgressSender>,
    ) -> Result<UploadedFile>;

    /// Fetch a resource as raw bytes, keeping the interesting headers
    async fn fetch_binary(&self, endpoint: &str, query: &[(String, String)])
        -> Result<BinaryResponse>;
}

/// Read the bearer token out of the persisted session storage file
///
/// Malformed or missing storage is tolerated: the request proceeds
/// unauthenticated.
pub fn read_stored_token(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&content) {
        Ok(value) => value
            .get("state")
            .and_then(|state| state.get("token"))
            .and_then(|token| token.as_str())
            .filter(|token| !token.is_empty())
            .map(String::from),
        Err(err) => {
            warn!("malformed session storage, proceeding unauthenticated: {}", err);
            None
        }
    }
}

/// HTTP client for the iServe API
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder().timeout(Duration::from_secs(config.timeout));

        if !config.use_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    fn bearer_token(&self) -> Option<String> {
        read_stored_token(&self.config.storage.session_path())
    }

    /// Remove the persisted session; called when the server reports the
    /// session as expired
    fn clear_session(&self) {
        let path = self.config.storage.session_path();
        if path.exists() {
            if let Err(err) = std::fs::remove_file(&path) {
                warn!("failed to clear session storage: {}", err);
            }
        }
    }

    /// Map a failure status to a user-facing error, logging the surfaced
    /// message before returning it so callers can still recover locally
    fn error_for_status(&self, status: u16, body: &str) -> IserveError {
        let server_message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));

        let err = match status {
            400 => IserveError::api(
                400,
                server_message.unwrap_or_else(|| "Invalid request parameters".to_string()),
            ),
            401 => {
                self.clear_session();
                IserveError::session_expired("Login expired, please sign in again")
            }
            403 => IserveError::api(403, "No permission to access this resource"),
            404 => IserveError::api(404, "Requested resource does not exist"),
            500 => IserveError::api(500, "Internal server error"),
            other => IserveError::api(
                other,
                server_message.unwrap_or_else(|| format!("Request failed ({})", other)),
            ),
        };

        warn!("{}", err);
        err
    }

    fn transport_error(&self, err: reqwest::Error) -> IserveError {
        if err.is_connect() || err.is_timeout() {
            warn!("Network connection failed, please check your connection: {}", err);
        } else {
            warn!("request failed before a response arrived: {}", err);
        }
        IserveError::network_from_reqwest(err)
    }

    async fn decode_response<R>(&self, response: reqwest::Response) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.error_for_status(status.as_u16(), &body));
        }

        let text = response.text().await?;
        let payload = if text.trim().is_empty() { "null" } else { &text };

        serde_json::from_str(payload)
            .map_err(|err| IserveError::invalid_response(format!("Invalid API response: {}", err)))
    }
}

impl ApiClient for HttpClient {
    fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn request<T, R>(&self, method: Method, endpoint: &str, payload: Option<&T>) -> Result<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint_url(endpoint);
        debug!("{} {}", method, url);

        let mut request_builder = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json");

        if let Some(token) = self.bearer_token() {
            request_builder = request_builder.bearer_auth(token);
        }

        if let Some(data) = payload {
            request_builder = request_builder.json(data);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.decode_response(response).await
    }

    async fn request_query<R>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.config.endpoint_url(endpoint);
        debug!("{} {} (query)", method, url);

        let mut request_builder = self.client.request(method, &url).query(query);

        if let Some(token) = self.bearer_token() {
            request_builder = request_builder.bearer_auth(token);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.decode_response(response).await
    }

    async fn upload_file(
        &self,
        method: Method,
        endpoint: &str,
        source: UploadSource,
        progress: Option<ProgressSender>,
    ) -> Result<UploadedFile> {
        let url = self.config.endpoint_url(endpoint);
        debug!("{} {} ({}, {} bytes)", method, url, source.filename, source.size);

        let file = tokio::fs::File::open(&source.path)
            .await
            .map_err(|e| IserveError::io_from_error("Attachment open", e))?;

        // Translate the transport's byte counts into 0-100 progress events
        let total = source.size.max(1);
        let mut sent: u64 = 0;
        let stream = ReaderStream::new(file).inspect_ok(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(tx) = &progress {
                tx.send_replace((sent.min(total) * 100 / total) as u8);
            }
        });

        let part = multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(stream),
            source.size,
        )
        .file_name(source.filename.clone())
        .mime_str(&source.mime)
        .map_err(|e| IserveError::upload(format!("Invalid MIME type: {}", e)))?;

        let form = multipart::Form::new().part("file", part);

        let mut request_builder = self.client.request(method, &url).multipart(form);

        if let Some(token) = self.bearer_token() {
            request_builder = request_builder.bearer_auth(token);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.decode_response(response).await
    }

    async fn fetch_binary(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<BinaryResponse> {
        let url = self.config.endpoint_url(endpoint);
        debug!("GET {} (binary)", url);

        let mut request_builder = self.client.get(&url).query(query);

        if let Some(token) = self.bearer_token() {
            request_builder = request_builder.bearer_auth(token);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.error_for_status(status.as_u16(), &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response.bytes().await?.to_vec();

        Ok(BinaryResponse {
            bytes,
            content_type,
            content_disposition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::test_helpers::*;

    #[test]
    fn stored_token_read_from_state_wrapper() {
        let temp_dir = create_temp_dir();
        let path = write_session_file(
            &temp_dir,
            r#"{"state":{"isLoggedIn":true,"token":"tok-1","userInfo":{"username":"alice"}}}"#,
        );
        assert_eq!(read_stored_token(&path), Some("tok-1".to_string()));
    }

    #[test]
    fn missing_or_malformed_storage_yields_none() {
        let temp_dir = create_temp_dir();

        assert_eq!(read_stored_token(&temp_dir.path().join("absent.json")), None);

        let path = write_session_file(&temp_dir, "not json at all {");
        assert_eq!(read_stored_token(&path), None);

        let path = write_session_file(&temp_dir, r#"{"state":{"token":""}}"#);
        assert_eq!(read_stored_token(&path), None);
    }
}
