//! Cortex authentication.
//!
//! Two independent credentials are needed: a bearer token from the OAuth2
//! client-credentials exchange (used by the `webapi` surface) and a cookie
//! token from the legacy login call (passed as `token=` to the `API` surface).

pub mod endpoints;
pub mod error;
pub mod responses;
pub mod session;

use serde_json::json;

use crate::cortex::error::ApiError;
use crate::cortex::transport::{ApiRequest, Transport};

use self::endpoints::Endpoints;
use self::error::AuthError;
use self::responses::{LoginResponse, TokenResponse};
pub use self::session::{AuthMode, Session, SessionManager};

/// Out-of-band credentials for both authentication surfaces.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    fn validate(&self) -> Result<(), AuthError> {
        if self.client_id.is_empty() {
            return Err(AuthError::MissingCredential("client id"));
        }
        if self.client_secret.is_empty() {
            return Err(AuthError::MissingCredential("client secret"));
        }
        Ok(())
    }
}

/// Run both credential exchanges and build a fresh [`Session`].
///
/// A failed token exchange is fatal. A failed cookie login is not: the
/// session is returned without a cookie so bearer-only calls keep working.
pub async fn authenticate(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    credentials: &Credentials,
) -> Result<Session, AuthError> {
    credentials.validate()?;

    tracing::info!("Requesting bearer token");
    let request = ApiRequest::post(&endpoints.token)
        .header("accept", "application/json")
        .json(json!({
            "grant_type": "client_credentials",
            "client_id": credentials.client_id,
            "client_secret": credentials.client_secret,
        }));
    let response = transport.send(request).await?;
    if !response.is_success() {
        return Err(ApiError::from_status(&endpoints.token, response.status, &response.body).into());
    }
    let token: TokenResponse = response.json(&endpoints.token)?;
    if token.access_token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    tracing::info!("Requesting cookie token");
    let cookie = request_cookie(transport, endpoints, credentials).await?;
    if cookie.is_some() {
        tracing::info!("Session tokens refreshed");
    }

    Ok(Session::new(token.access_token, cookie))
}

async fn request_cookie(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    credentials: &Credentials,
) -> Result<Option<String>, AuthError> {
    let request = ApiRequest::post(&endpoints.login)
        .query("Login", &credentials.username)
        .query("Password", &credentials.password)
        .query("format", "json");
    let response = transport.send(request).await?;

    if !response.is_success() {
        tracing::warn!(
            status = response.status,
            "Cookie login rejected, continuing without cookie token"
        );
        return Ok(None);
    }

    match response.json::<LoginResponse>(&endpoints.login) {
        Ok(login) => match login.cookie_token() {
            Some(token) => Ok(Some(token.to_string())),
            None => {
                tracing::warn!(
                    code = %login.api_response.code,
                    "Cookie login did not succeed, continuing without cookie token"
                );
                Ok(None)
            }
        },
        Err(e) => {
            tracing::warn!("Unreadable cookie login response, continuing without cookie token: {}", e);
            Ok(None)
        }
    }
}
