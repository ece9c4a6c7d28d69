use thiserror::Error;

use crate::auth::error::AuthError;

/// Failure of a single Cortex API call.
///
/// Callers match on the variant rather than inspecting status codes: a 401
/// that survived re-authentication surfaces as `Unauthorized`, any other
/// non-success status as `Remote`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized (HTTP 401) from {url}")]
    Unauthorized { url: String },

    #[error("API error (HTTP {status}) from {url}: {message}")]
    Remote {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Network error calling {url}: {message}")]
    Network { url: String, message: String },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Authentication failed: {0}")]
    Authentication(#[source] Box<AuthError>),
}

/// Longest response body excerpt carried in a `Remote` error.
const MESSAGE_LIMIT: usize = 300;

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(url: &str, status: u16, body: &str) -> Self {
        if status == 401 {
            return Self::Unauthorized {
                url: url.to_string(),
            };
        }
        let mut message: String = body.trim().chars().take(MESSAGE_LIMIT).collect();
        if message.is_empty() {
            message = "<empty body>".to_string();
        }
        Self::Remote {
            url: url.to_string(),
            status,
            message,
        }
    }

    /// HTTP status code associated with the failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Remote { status, .. } => Some(*status),
            Self::Network { .. } | Self::Decode { .. } | Self::Authentication(_) => None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::Authentication(Box::new(e))
    }
}
