//! Authentication API DTOs
//!
//! Login and registration requests, plus the known response shapes the
//! backend has been observed to return for login. The backend's login reply
//! has never been pinned down to a single schema, so the client decodes it
//! through an ordered list of candidates and falls back to default
//! construction when none carries a usable token.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::common::UserProfile;

// ============================================================================
// Requests
// ============================================================================

/// Username/password pair sent as query parameters to the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Registration uses the same username/password pair
pub type RegisterRequest = Credentials;

/// Profile fields a user may change about themselves
///
/// Sent as the JSON body of `PUT /users/{username}`; absent fields are left
/// untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// ============================================================================
// Login responses
// ============================================================================

/// Inner object of the `{ "data": { ... } }` login envelope
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvelopedLogin {
    pub token: Option<String>,
    pub access_token: Option<String>,
    pub user: Option<UserProfile>,
    pub user_info: Option<UserProfile>,
}

/// Known login response shapes, tried in declaration order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LoginReply {
    /// `{ "token": "...", "user": { ... } }`
    Token {
        token: String,
        user: Option<UserProfile>,
    },
    /// `{ "data": { "token": "...", "user": { ... } } }`
    Enveloped { data: EnvelopedLogin },
    /// `{ "accessToken": "...", "userInfo": { ... } }`
    #[serde(rename_all = "camelCase")]
    AccessToken {
        access_token: String,
        user_info: Option<UserProfile>,
        user: Option<UserProfile>,
    },
    /// Anything else; resolved field by field, then by default construction
    Other(Value),
}

/// Registration responses are a bare profile, sometimes `data`-wrapped,
/// never carrying a token
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RegisterReply {
    Enveloped { data: UserProfile },
    Profile(UserProfile),
}

impl RegisterReply {
    pub fn into_profile(self) -> UserProfile {
        match self {
            RegisterReply::Enveloped { data } => data,
            RegisterReply::Profile(profile) => profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_reply_prefers_plain_token_shape() {
        let reply: LoginReply =
            serde_json::from_str(r#"{"token":"t1","user":{"username":"alice"}}"#).unwrap();
        match reply {
            LoginReply::Token { token, user } => {
                assert_eq!(token, "t1");
                assert_eq!(user.unwrap().username, "alice");
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn login_reply_decodes_envelope() {
        let reply: LoginReply =
            serde_json::from_str(r#"{"data":{"token":"t2","user":{"username":"bob"}}}"#).unwrap();
        match reply {
            LoginReply::Enveloped { data } => {
                assert_eq!(data.token.as_deref(), Some("t2"));
                assert_eq!(data.user.unwrap().username, "bob");
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn login_reply_decodes_access_token_shape() {
        let reply: LoginReply =
            serde_json::from_str(r#"{"accessToken":"t3","userInfo":{"username":"eve"}}"#).unwrap();
        match reply {
            LoginReply::AccessToken {
                access_token,
                user_info,
                ..
            } => {
                assert_eq!(access_token, "t3");
                assert_eq!(user_info.unwrap().username, "eve");
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn unrecognized_reply_falls_through_to_other() {
        let reply: LoginReply = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(matches!(reply, LoginReply::Other(_)));
    }

    #[test]
    fn register_reply_unwraps_envelope() {
        let wrapped: RegisterReply =
            serde_json::from_str(r#"{"data":{"username":"carol"}}"#).unwrap();
        assert_eq!(wrapped.into_profile().username, "carol");

        let bare: RegisterReply = serde_json::from_str(r#"{"username":"dave"}"#).unwrap();
        assert_eq!(bare.into_profile().username, "dave");
    }

    #[test]
    fn credentials_reject_empty_fields() {
        let creds = Credentials {
            username: String::new(),
            password: "x".into(),
        };
        assert!(creds.validate().is_err());
    }
}
