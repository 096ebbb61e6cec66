//! User session store for the iServe client
//!
//! Owns the session lifecycle and credential persistence. Only
//! `{is_logged_in, token, user_info}` are persisted, wrapped in the
//! `{"state": ...}` shape under the `user-storage` key; everything else is
//! transient and reset on load.
//!
//! The login endpoint's response shape has drifted over time, so the reply is
//! decoded through an ordered list of known schemas and falls back to a
//! locally synthesized token and a minimal profile built from the submitted
//! username. The store never produces a half-session: every path converges to
//! fully-logged-in or fully-failed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use validator::Validate;

use iserve_protocol::api::{Credentials, LoginReply, RegisterRequest, UserUpdateRequest};
use iserve_protocol::api::auth::RegisterReply;
use iserve_protocol::common::UserProfile;

use crate::client::ApiClient;
use crate::config::StorageConfig;
use crate::error::{IserveError, Result};

/// Prefix of tokens synthesized locally when the server returns none
pub const TEMP_TOKEN_PREFIX: &str = "temp-token-";

/// The persisted portion of the session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    pub is_logged_in: bool,
    pub token: Option<String>,
    pub user_info: UserProfile,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(default)]
    state: SessionState,
}

/// Session store backed by the `user-storage` file
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    state: SessionState,
    last_error: Option<String>,
}

impl SessionStore {
    /// Open the store, loading any persisted session
    pub fn open(storage: &StorageConfig) -> Self {
        let path = storage.session_path();
        let state = Self::load(&path);
        Self {
            path,
            state,
            last_error: None,
        }
    }

    fn load(path: &Path) -> SessionState {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return SessionState::default(),
        };

        match serde_json::from_str::<PersistedSession>(&content) {
            Ok(persisted) => persisted.state,
            Err(err) => {
                warn!("discarding malformed session storage: {}", err);
                SessionState::default()
            }
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IserveError::io_from_error("Session storage", e))?;
        }

        let persisted = PersistedSession {
            state: self.state.clone(),
        };
        let content = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(&self.path, content)
            .map_err(|e| IserveError::io_from_error("Session storage", e))?;
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn user_info(&self) -> &UserProfile {
        &self.state.user_info
    }

    /// Message of the most recent failed operation, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Authenticate against the server
    ///
    /// Returns a success flag rather than an error so callers can
    /// unconditionally chain UI feedback; the failure message is available
    /// from [`last_error`](Self::last_error).
    pub async fn login<C: ApiClient>(&mut self, client: &C, credentials: &Credentials) -> bool {
        self.last_error = None;
        match self.try_login(client, credentials).await {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    async fn try_login<C: ApiClient>(&mut self, client: &C, credentials: &Credentials) -> Result<()> {
        credentials.validate()?;

        let query = credentials_query(credentials);
        let reply: LoginReply = client
            .request_query(Method::POST, "/auth/login", &query)
            .await?;

        let (token, profile) = resolve_login(reply, &credentials.username);

        self.state = SessionState {
            is_logged_in: true,
            token: Some(token),
            user_info: profile,
        };
        self.save()
    }

    /// Register a new user and start an authenticated session
    pub async fn register<C: ApiClient>(&mut self, client: &C, data: &RegisterRequest) -> bool {
        self.register_at(client, "/auth/register", data).await
    }

    /// Register a new administrator and start an authenticated session
    pub async fn register_admin<C: ApiClient>(&mut self, client: &C, data: &RegisterRequest) -> bool {
        self.register_at(client, "/auth/register-admin", data).await
    }

    async fn register_at<C: ApiClient>(
        &mut self,
        client: &C,
        endpoint: &str,
        data: &RegisterRequest,
    ) -> bool {
        self.last_error = None;
        match self.try_register(client, endpoint, data).await {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    async fn try_register<C: ApiClient>(
        &mut self,
        client: &C,
        endpoint: &str,
        data: &RegisterRequest,
    ) -> Result<()> {
        data.validate()?;

        let query = credentials_query(data);
        let reply: RegisterReply = client.request_query(Method::POST, endpoint, &query).await?;

        let mut profile = reply.into_profile();
        if profile.username.is_empty() {
            profile.username = data.username.clone();
        }

        // Registration replies carry no token; start the session on a
        // synthesized one
        self.state = SessionState {
            is_logged_in: true,
            token: Some(temp_token()),
            user_info: profile,
        };
        self.save()
    }

    /// End the session and clear persisted storage
    pub fn logout(&mut self) {
        self.state = SessionState::default();
        self.last_error = None;

        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                warn!("failed to clear session storage: {}", err);
            }
        }
    }

    /// Update the current user's profile
    ///
    /// The returned fields are merged onto the current profile; the token and
    /// logged-in flag live outside the profile and cannot be revoked by the
    /// server response.
    pub async fn update_user_info<C: ApiClient>(
        &mut self,
        client: &C,
        patch: &UserUpdateRequest,
    ) -> bool {
        self.last_error = None;
        match self.try_update_user_info(client, patch).await {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    async fn try_update_user_info<C: ApiClient>(
        &mut self,
        client: &C,
        patch: &UserUpdateRequest,
    ) -> Result<()> {
        let username = self.state.user_info.username.clone();
        if username.is_empty() {
            return Err(IserveError::invalid_input(
                "User information is incomplete, cannot update",
            ));
        }

        let endpoint = format!("/users/{}", username);
        let reply: Value = client
            .request(Method::PUT, &endpoint, Some(patch))
            .await?;

        let returned: UserProfile = match reply.get("data") {
            Some(data) => serde_json::from_value(data.clone()).unwrap_or_default(),
            None => serde_json::from_value(reply).unwrap_or_default(),
        };

        let merged = {
            let current = &self.state.user_info;
            UserProfile {
                id: returned.id.or_else(|| current.id.clone()),
                username: if returned.username.is_empty() {
                    current.username.clone()
                } else {
                    returned.username
                },
                real_name: returned.real_name.or_else(|| current.real_name.clone()),
                phone: returned.phone.or_else(|| current.phone.clone()),
                biography: returned.biography.or_else(|| current.biography.clone()),
                email: returned.email.or_else(|| current.email.clone()),
                avatar: returned.avatar.or_else(|| current.avatar.clone()),
                created_at: returned.created_at.or(current.created_at),
                updated_at: returned.updated_at.or(Some(Utc::now())),
            }
        };
        self.state.user_info = merged;
        self.save()
    }
}

fn credentials_query(credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        ("username".to_string(), credentials.username.clone()),
        ("password".to_string(), credentials.password.clone()),
    ]
}

fn temp_token() -> String {
    format!("{}{}", TEMP_TOKEN_PREFIX, Utc::now().timestamp_millis())
}

/// Resolve a login reply to a token and profile
///
/// Shapes are tried in order; whatever the reply lacks is filled from the
/// fallback ladder, ending in default construction so the session is always
/// fully formed.
fn resolve_login(reply: LoginReply, username: &str) -> (String, UserProfile) {
    match reply {
        LoginReply::Token { token, user } => {
            (token, user.unwrap_or_else(|| UserProfile::placeholder(username)))
        }
        LoginReply::Enveloped { data } => {
            let token = data
                .token
                .or(data.access_token)
                .unwrap_or_else(temp_token);
            let profile = data
                .user
                .or(data.user_info)
                .unwrap_or_else(|| UserProfile::placeholder(username));
            (token, profile)
        }
        LoginReply::AccessToken {
            access_token,
            user_info,
            user,
        } => {
            let profile = user_info
                .or(user)
                .unwrap_or_else(|| UserProfile::placeholder(username));
            (access_token, profile)
        }
        LoginReply::Other(value) => {
            let token = pluck_string(&value, &["accessToken"])
                .or_else(|| pluck_string(&value, &["auth_token"]))
                .or_else(|| pluck_string(&value, &["data", "accessToken"]))
                .unwrap_or_else(|| {
                    warn!("login response carried no token, synthesizing a temporary one");
                    temp_token()
                });

            let profile = pluck_profile(&value, &["userInfo"])
                .or_else(|| pluck_profile(&value, &["data", "userInfo"]))
                .or_else(|| pluck_profile(&value, &["user"]))
                .or_else(|| pluck_profile(&value, &["data", "user"]))
                .unwrap_or_else(|| {
                    warn!("login response carried no profile, using the submitted username");
                    UserProfile::placeholder(username)
                });

            (token, profile)
        }
    }
}

fn pluck<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn pluck_string(value: &Value, path: &[&str]) -> Option<String> {
    pluck(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn pluck_profile(value: &Value, path: &[&str]) -> Option<UserProfile> {
    let found = pluck(value, path)?;
    if !found.is_object() {
        return None;
    }
    serde_json::from_value(found.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockApiClient;
    use crate::tests::utils::test_helpers::*;
    use serde_json::json;

    fn setup() -> (tempfile::TempDir, MockApiClient, SessionStore) {
        let temp_dir = create_temp_dir();
        let config = test_client_config(&temp_dir);
        let store = SessionStore::open(&config.storage);
        (temp_dir, MockApiClient::new(config), store)
    }

    fn creds(username: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: "x".to_string(),
        }
    }

    #[tokio::test]
    async fn login_with_token_and_user_shape() {
        let (_tmp, client, mut store) = setup();
        client.add_response(
            "/auth/login",
            json!({"token": "t1", "user": {"id": 7, "username": "alice"}}),
        );

        assert!(store.login(&client, &creds("alice")).await);
        assert!(store.is_logged_in());
        assert_eq!(store.token(), Some("t1"));
        assert_eq!(store.user_info().id.as_deref(), Some("7"));
        assert_eq!(store.user_info().username, "alice");
    }

    #[tokio::test]
    async fn login_with_enveloped_shape() {
        let (_tmp, client, mut store) = setup();
        client.add_response(
            "/auth/login",
            json!({"data": {"token": "t2", "user": {"username": "bob"}}}),
        );

        assert!(store.login(&client, &creds("bob")).await);
        assert_eq!(store.token(), Some("t2"));
        assert_eq!(store.user_info().username, "bob");
    }

    #[tokio::test]
    async fn login_with_access_token_shape() {
        let (_tmp, client, mut store) = setup();
        client.add_response(
            "/auth/login",
            json!({"accessToken": "t3", "userInfo": {"username": "eve"}}),
        );

        assert!(store.login(&client, &creds("eve")).await);
        assert_eq!(store.token(), Some("t3"));
        assert_eq!(store.user_info().username, "eve");
    }

    #[tokio::test]
    async fn login_with_empty_reply_synthesizes_session() {
        let (_tmp, client, mut store) = setup();
        client.add_response("/auth/login", json!({}));

        assert!(store.login(&client, &creds("alice")).await);
        assert!(store.is_logged_in());
        assert!(store.token().unwrap().starts_with(TEMP_TOKEN_PREFIX));
        assert_eq!(store.user_info().username, "alice");
    }

    #[tokio::test]
    async fn login_failure_leaves_store_logged_out() {
        let (_tmp, client, mut store) = setup();
        client.add_error("/auth/login", IserveError::api(400, "Bad credentials"));

        assert!(!store.login(&client, &creds("alice")).await);
        assert!(!store.is_logged_in());
        assert!(store.last_error().unwrap().contains("Bad credentials"));
    }

    #[tokio::test]
    async fn login_rejects_empty_credentials_locally() {
        let (_tmp, client, mut store) = setup();

        assert!(!store.login(&client, &creds("")).await);
        assert!(client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn register_synthesizes_temp_token() {
        let (_tmp, client, mut store) = setup();
        client.add_response("/auth/register", json!({"id": "9", "username": "carol"}));

        assert!(store.register(&client, &creds("carol")).await);
        assert!(store.token().unwrap().starts_with(TEMP_TOKEN_PREFIX));
        assert_eq!(store.user_info().username, "carol");
    }

    #[tokio::test]
    async fn register_admin_uses_admin_endpoint() {
        let (_tmp, client, mut store) = setup();
        client.add_response("/auth/register-admin", json!({"username": "root"}));

        assert!(store.register_admin(&client, &creds("root")).await);

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, "/auth/register-admin");
    }

    #[tokio::test]
    async fn session_persists_across_reopen() {
        let (tmp, client, mut store) = setup();
        client.add_response("/auth/login", json!({"token": "t1", "user": {"username": "alice"}}));
        assert!(store.login(&client, &creds("alice")).await);

        let reopened = SessionStore::open(&test_client_config(&tmp).storage);
        assert!(reopened.is_logged_in());
        assert_eq!(reopened.token(), Some("t1"));
        assert_eq!(reopened.user_info().username, "alice");
    }

    #[tokio::test]
    async fn load_ignores_transient_and_unknown_fields() {
        let (tmp, _client, _store) = setup();
        write_session_file(
            &tmp,
            r#"{"state":{"isLoggedIn":true,"token":"t1","userInfo":{"username":"alice"},
                "loading":true,"error":"stale"},"version":0}"#,
        );

        let reopened = SessionStore::open(&test_client_config(&tmp).storage);
        assert!(reopened.is_logged_in());
        assert_eq!(reopened.token(), Some("t1"));
        assert!(reopened.last_error().is_none());
    }

    #[tokio::test]
    async fn logout_clears_state_and_storage() {
        let (tmp, client, mut store) = setup();
        client.add_response("/auth/login", json!({"token": "t1"}));
        assert!(store.login(&client, &creds("alice")).await);

        store.logout();
        assert!(!store.is_logged_in());
        assert_eq!(store.token(), None);

        let reopened = SessionStore::open(&test_client_config(&tmp).storage);
        assert!(!reopened.is_logged_in());
    }

    #[tokio::test]
    async fn update_user_info_preserves_token_and_login() {
        let (_tmp, client, mut store) = setup();
        client.add_response("/auth/login", json!({"token": "t1", "user": {"username": "alice"}}));
        assert!(store.login(&client, &creds("alice")).await);

        client.add_response(
            "/users/alice",
            json!({"data": {"username": "alice", "email": "a@example.org"}}),
        );

        let patch = UserUpdateRequest {
            email: Some("a@example.org".to_string()),
            ..UserUpdateRequest::default()
        };
        assert!(store.update_user_info(&client, &patch).await);

        assert_eq!(store.user_info().email.as_deref(), Some("a@example.org"));
        assert_eq!(store.token(), Some("t1"));
        assert!(store.is_logged_in());
    }

    #[tokio::test]
    async fn update_user_info_requires_username() {
        let (_tmp, client, mut store) = setup();

        let patch = UserUpdateRequest::default();
        assert!(!store.update_user_info(&client, &patch).await);
        assert!(store.last_error().unwrap().contains("incomplete"));
        assert!(client.get_requests().is_empty());
    }
}
