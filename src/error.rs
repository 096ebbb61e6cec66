//! Unified error handling for the iServe CLI and SDK
//!
//! This module provides a structured error system with:
//! - Unique error codes for debugging and documentation
//! - Structured error information with context
//! - Convenient constructor methods
//! - Automatic conversions from common error types

use std::fmt;
use thiserror::Error;

/// Unified Result type for all iServe operations
pub type Result<T> = std::result::Result<T, IserveError>;

/// Error codes for iServe operations
///
/// Each error has a unique code in the format `EXXX` where:
/// - E1XX: Authentication and authorization errors
/// - E2XX: Network and API errors
/// - E3XX: File and I/O errors
/// - E4XX: Configuration errors
/// - E5XX: Validation and input errors
/// - E6XX: Resource and local store errors
/// - E7XX: UI and interaction errors
/// - E9XX: Internal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (E1XX)
    /// E101: Authentication failed
    AuthenticationFailed,
    /// E102: Authorization denied
    AuthorizationDenied,
    /// E103: Session expired
    SessionExpired,
    /// E104: No active session
    SessionNotFound,

    // Network (E2XX)
    /// E201: HTTP request failed
    HttpError,
    /// E202: Connection timeout
    ConnectionTimeout,
    /// E203: Connection refused
    ConnectionRefused,
    /// E204: API returned error response
    ApiError,
    /// E205: Invalid API response format
    InvalidResponse,

    // File/IO (E3XX)
    /// E301: File not found
    FileNotFound,
    /// E302: File read error
    FileReadError,
    /// E303: File write error
    FileWriteError,
    /// E304: File exceeds the size limit
    FileTooLarge,

    // Configuration (E4XX)
    /// E401: Configuration error
    ConfigError,
    /// E402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (E5XX)
    /// E501: Invalid input
    InvalidInput,
    /// E502: Validation failed
    ValidationFailed,
    /// E503: Unsupported file type
    UnsupportedFileType,

    // Resource/Store (E6XX)
    /// E601: Resource not found
    ResourceNotFound,
    /// E602: Local store error
    StoreError,
    /// E603: Upload failed
    UploadFailed,

    // UI (E7XX)
    /// E701: Dialog error
    DialogError,
    /// E702: User cancelled
    UserCancelled,

    // Internal (E9XX)
    /// E901: Internal error
    InternalError,
    /// E902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            // Authentication (E1XX)
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::AuthorizationDenied => 102,
            ErrorCode::SessionExpired => 103,
            ErrorCode::SessionNotFound => 104,

            // Network (E2XX)
            ErrorCode::HttpError => 201,
            ErrorCode::ConnectionTimeout => 202,
            ErrorCode::ConnectionRefused => 203,
            ErrorCode::ApiError => 204,
            ErrorCode::InvalidResponse => 205,

            // File/IO (E3XX)
            ErrorCode::FileNotFound => 301,
            ErrorCode::FileReadError => 302,
            ErrorCode::FileWriteError => 303,
            ErrorCode::FileTooLarge => 304,

            // Configuration (E4XX)
            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            // Validation (E5XX)
            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,
            ErrorCode::UnsupportedFileType => 503,

            // Resource/Store (E6XX)
            ErrorCode::ResourceNotFound => 601,
            ErrorCode::StoreError => 602,
            ErrorCode::UploadFailed => 603,

            // UI (E7XX)
            ErrorCode::DialogError => 701,
            ErrorCode::UserCancelled => 702,

            // Internal (E9XX)
            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "E101")
    pub fn as_str(&self) -> String {
        format!("E{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.code())
    }
}

/// Main error type for all iServe operations
#[derive(Error, Debug)]
pub enum IserveError {
    /// Authentication failed or session expired
    #[error("[{code}] Authentication failed: {message}")]
    Authentication {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authorization denied
    #[error("[{code}] Authorization denied: {message}")]
    Authorization { code: ErrorCode, message: String },

    /// HTTP/Network error
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// API error with status code
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    /// File or IO error
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration error
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    /// Validation error
    #[error("[{code}] Validation error: {message}")]
    Validation {
        code: ErrorCode,
        message: String,
        field: Option<String>,
    },

    /// Invalid input error
    #[error("[{code}] Invalid input: {message}")]
    InvalidInput { code: ErrorCode, message: String },

    /// Resource not found
    #[error("[{code}] Not found: {resource}")]
    NotFound { code: ErrorCode, resource: String },

    /// Local store error
    #[error("[{code}] Store error: {message}")]
    Store { code: ErrorCode, message: String },

    /// Upload error
    #[error("[{code}] Upload failed: {message}")]
    Upload { code: ErrorCode, message: String },

    /// UI/Dialog error
    #[error("[{code}] UI error: {message}")]
    Ui { code: ErrorCode, message: String },

    /// Internal/Unexpected error
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    /// JSON serialization error
    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Timeout error
    #[error("[E202] Operation timed out")]
    Timeout,
}

// ==================== Constructor Methods ====================

impl IserveError {
    // --- Authentication ---

    /// Create authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
            source: None,
        }
    }

    /// Create session expired error
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::SessionExpired,
            message: message.into(),
            source: None,
        }
    }

    /// Create no-session error
    pub fn session_not_found(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::SessionNotFound,
            message: message.into(),
            source: None,
        }
    }

    /// Create authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            code: ErrorCode::AuthorizationDenied,
            message: message.into(),
        }
    }

    // --- Network ---

    /// Create network error from message
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCode::HttpError,
            message: message.into(),
            source: None,
        }
    }

    /// Create network error from reqwest error
    pub fn network_from_reqwest(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if err.is_connect() {
            ErrorCode::ConnectionRefused
        } else {
            ErrorCode::HttpError
        };

        Self::Network {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    /// Create invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status: 0,
            message: message.into(),
        }
    }

    // --- File/IO ---

    /// Create IO error with context
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            code: ErrorCode::FileReadError,
            context: context.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create IO error from std::io::Error
    pub fn io_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::FileWriteError,
            _ => ErrorCode::FileReadError,
        };

        Self::Io {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::Io {
            code: ErrorCode::FileNotFound,
            context: "File not found".to_string(),
            message: path.into(),
            source: None,
        }
    }

    /// Create file-too-large error
    pub fn file_too_large(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::FileTooLarge,
            message: message.into(),
            field: None,
        }
    }

    // --- Configuration ---

    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration error with source
    pub fn config_from_error(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }

    // --- Validation ---

    /// Create validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            field: None,
        }
    }

    /// Create validation error with field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create unsupported file type error
    pub fn unsupported_file_type(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::UnsupportedFileType,
            message: message.into(),
            field: None,
        }
    }

    /// Create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    // --- Resource/Store ---

    /// Create not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            code: ErrorCode::ResourceNotFound,
            resource: resource.into(),
        }
    }

    /// Create local store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            code: ErrorCode::StoreError,
            message: message.into(),
        }
    }

    /// Create upload error
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            code: ErrorCode::UploadFailed,
            message: message.into(),
        }
    }

    // --- UI ---

    /// Create UI error
    pub fn ui(message: impl Into<String>) -> Self {
        Self::Ui {
            code: ErrorCode::DialogError,
            message: message.into(),
        }
    }

    /// Create user cancelled error
    pub fn user_cancelled() -> Self {
        Self::Ui {
            code: ErrorCode::UserCancelled,
            message: "Operation cancelled by user".to_string(),
        }
    }

    // --- Internal ---

    /// Create internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: message.into(),
            source: None,
        }
    }

    // --- Utility Methods ---

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Authorization { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Io { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::InvalidInput { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Store { code, .. } => *code,
            Self::Upload { code, .. } => *code,
            Self::Ui { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
            Self::Timeout => ErrorCode::ConnectionTimeout,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Authorization { .. }
        )
    }

    /// Check if this is the fatal session-expired condition
    pub fn is_session_expired(&self) -> bool {
        self.code() == ErrorCode::SessionExpired
    }

    /// Check if this is a network error
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Api { .. } | Self::Timeout)
    }
}

// ==================== From Implementations ====================

impl From<std::io::Error> for IserveError {
    fn from(err: std::io::Error) -> Self {
        Self::io_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for IserveError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_from_reqwest(err)
    }
}

impl From<serde_json::Error> for IserveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for IserveError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_from_error(err)
    }
}

impl From<dialoguer::Error> for IserveError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Ui {
            code: ErrorCode::DialogError,
            message: format!("Dialog error: {}", err),
        }
    }
}

impl From<validator::ValidationErrors> for IserveError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: err.to_string(),
            field: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::AuthenticationFailed.code(), 101);
        assert_eq!(ErrorCode::HttpError.code(), 201);
        assert_eq!(ErrorCode::FileNotFound.code(), 301);
        assert_eq!(ErrorCode::ConfigError.code(), 401);
        assert_eq!(ErrorCode::StoreError.code(), 602);
    }

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::SessionExpired.as_str(), "E103");
        assert_eq!(ErrorCode::ApiError.as_str(), "E204");
    }

    #[test]
    fn test_error_display() {
        let err = IserveError::authentication("Invalid credentials");
        assert!(err.to_string().contains("E101"));
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[test]
    fn test_session_expired_detection() {
        assert!(IserveError::session_expired("Login expired").is_session_expired());
        assert!(!IserveError::authentication("Bad password").is_session_expired());
    }

    #[test]
    fn test_api_error_status() {
        let err = IserveError::api(404, "missing");
        assert_eq!(err.status(), Some(404));
        assert_eq!(IserveError::network("down").status(), None);
    }
}
