use crate::app_store_api::resources::ErrorDocument;
use std::fmt;

/// App Store Connect SDK error type
///
/// Represents all possible errors that can occur when minting tokens for,
/// or talking to, the App Store Connect and StoreKit server APIs.
#[derive(Debug)]
pub enum AppStoreError {
    /// Missing or unusable configuration (key material, key id, base URL)
    Config(String),
    /// Token signing failed (malformed key material)
    Signing(String),
    /// API request failed (network, HTTP, or response parsing error)
    Api(ApiError),
    /// A tester conflicted on create but could not be located by any strategy
    TesterResolution { email: String },
    /// No beta group carries the requested name
    GroupNotFound { name: String },
    /// Attaching a tester returned 404
    GroupOrTesterNotFound { group_id: String, tester_id: String },
    /// Attaching a tester returned 403
    PermissionDenied { group_id: String, tester_id: String },
    /// Attaching a tester returned 409 and the tester is still not a member
    AttachConflict {
        email: String,
        group_id: String,
        tester_id: String,
        detail: String,
    },
    /// Attaching a tester failed with any other HTTP status
    AttachFailed {
        email: String,
        status: u16,
        detail: String,
    },
}

impl fmt::Display for AppStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppStoreError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppStoreError::Signing(msg) => write!(f, "Token signing failed: {}", msg),
            AppStoreError::Api(err) => write!(f, "API error: {}", err),
            AppStoreError::TesterResolution { email } => write!(
                f,
                "Tester with email {} already exists but could not be found. \
                 This may be due to API delays or permissions issues.",
                email
            ),
            AppStoreError::GroupNotFound { name } => {
                write!(f, "Beta group \"{}\" not found", name)
            }
            AppStoreError::GroupOrTesterNotFound {
                group_id,
                tester_id,
            } => write!(
                f,
                "Group ({}) or tester ({}) not found (404)",
                group_id, tester_id
            ),
            AppStoreError::PermissionDenied {
                group_id,
                tester_id,
            } => write!(
                f,
                "Permission denied (403) adding tester {} to group {}. Check your API key permissions.",
                tester_id, group_id
            ),
            AppStoreError::AttachConflict {
                email,
                group_id,
                tester_id,
                detail,
            } => write!(
                f,
                "Failed to add tester {} ({}) to group {}: Conflict (409): {}",
                email, tester_id, group_id, detail
            ),
            AppStoreError::AttachFailed {
                email,
                status,
                detail,
            } => write!(
                f,
                "Failed to add tester {} to group: {} {}",
                email, status, detail
            ),
        }
    }
}

impl std::error::Error for AppStoreError {}

impl From<ApiError> for AppStoreError {
    fn from(err: ApiError) -> Self {
        AppStoreError::Api(err)
    }
}

impl From<jsonwebtoken::errors::Error> for AppStoreError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppStoreError::Signing(err.to_string())
    }
}

impl AppStoreError {
    /// HTTP status of the underlying remote failure, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            AppStoreError::Api(ApiError::Http { status, .. }) => Some(*status),
            AppStoreError::AttachFailed { status, .. } => Some(*status),
            AppStoreError::GroupOrTesterNotFound { .. } => Some(404),
            AppStoreError::PermissionDenied { .. } => Some(403),
            AppStoreError::AttachConflict { .. } => Some(409),
            _ => None,
        }
    }
}

/// API-specific errors
#[derive(Debug)]
pub enum ApiError {
    /// Network error (connection, timeout, etc.)
    Network(String),
    /// HTTP error with status code; `message` holds the raw response body
    Http { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Request building failed
    Request(String),
}

impl ApiError {
    /// Status code for HTTP errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parse the body of an HTTP error as an App Store Connect error document
    pub fn error_document(&self) -> Option<ErrorDocument> {
        match self {
            ApiError::Http { message, .. } => serde_json::from_str(message).ok(),
            _ => None,
        }
    }

    /// Human readable remote detail: the first error's `detail`, then its
    /// `title`, then the raw message.
    pub fn remote_detail(&self) -> String {
        if let Some(first) = self
            .error_document()
            .and_then(|doc| doc.errors.into_iter().next())
        {
            if let Some(detail) = first.detail.filter(|d| !d.is_empty()) {
                return detail;
            }
            if let Some(title) = first.title.filter(|t| !t.is_empty()) {
                return title;
            }
        }

        match self {
            ApiError::Http { message, .. } if message.is_empty() => "Unknown error".to_string(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Network(msg) | ApiError::Parse(msg) | ApiError::Request(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { status, message } => {
                write!(f, "HTTP {} error: {}", status, message)
            }
            ApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ApiError::Request(msg) => write!(f, "Request error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timeout".to_string())
        } else if err.is_connect() {
            ApiError::Network(format!("Connection failed: {}", err))
        } else if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
