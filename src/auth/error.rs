use thiserror::Error;

use crate::cortex::error::ApiError;

/// Errors raised while obtaining Cortex session credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication request failed: {0}")]
    Request(#[from] ApiError),

    #[error("Token exchange response did not contain an access token")]
    MissingToken,

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}
