use tokio::sync::RwLock;

use super::endpoints::Endpoints;
use super::Credentials;
use crate::cortex::error::ApiError;
use crate::cortex::transport::{ApiRequest, ApiResponse, Transport};

/// Credentials obtained from a successful [`super::authenticate`] call.
///
/// Replaced wholesale on refresh; never partially updated.
#[derive(Clone)]
pub struct Session {
    bearer: String,
    cookie: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("bearer", &"<redacted>")
            .field("has_cookie", &self.cookie.is_some())
            .finish()
    }
}

impl Session {
    pub fn new(bearer: String, cookie: Option<String>) -> Self {
        Self { bearer, cookie }
    }

    pub fn bearer(&self) -> &str {
        &self.bearer
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Value for the `token` query parameter; empty when login failed.
    pub fn cookie_param(&self) -> &str {
        self.cookie.as_deref().unwrap_or("")
    }
}

/// Which credential a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `Authorization: Bearer` header.
    Bearer,
    /// `token=` query parameter.
    Cookie,
}

/// Owns the process-wide [`Session`] and the transport used to reach Cortex.
///
/// Every authorized call goes through [`SessionManager::send`], which retries
/// exactly once after re-authenticating when the server answers 401.
pub struct SessionManager {
    transport: Box<dyn Transport>,
    endpoints: Endpoints,
    credentials: Credentials,
    session: RwLock<Option<Session>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoints", &self.endpoints)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(transport: Box<dyn Transport>, endpoints: Endpoints, credentials: Credentials) -> Self {
        Self {
            transport,
            endpoints,
            credentials,
            session: RwLock::new(None),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Exchange credentials and replace the current session.
    pub async fn authenticate(&self) -> Result<(), super::error::AuthError> {
        let fresh = super::authenticate(self.transport.as_ref(), &self.endpoints, &self.credentials)
            .await?;
        *self.session.write().await = Some(fresh);
        Ok(())
    }

    /// Current session, authenticating first if none exists yet.
    async fn current(&self) -> Result<Session, ApiError> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.clone());
        }
        self.authenticate().await?;
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| ApiError::Unauthorized {
                url: self.endpoints.token.clone(),
            })
    }

    fn attach(request: &ApiRequest, mode: AuthMode, session: &Session) -> ApiRequest {
        match mode {
            AuthMode::Bearer => request
                .clone()
                .header("Authorization", format!("Bearer {}", session.bearer()))
                .header("accept", "application/json"),
            AuthMode::Cookie => request.clone().query("token", session.cookie_param()),
        }
    }

    /// Send `request` with current credentials attached.
    ///
    /// On 401: re-authenticate once, re-attach fresh credentials and retry
    /// once. Any non-success status after that is returned as an error.
    pub async fn send(&self, request: ApiRequest, mode: AuthMode) -> Result<ApiResponse, ApiError> {
        let session = self.current().await?;
        let response = self
            .transport
            .send(Self::attach(&request, mode, &session))
            .await?;

        let response = if response.status == 401 {
            tracing::warn!(url = %request.url, "Got 401, refreshing tokens and retrying once");
            self.authenticate().await?;
            let session = self.current().await?;
            self.transport
                .send(Self::attach(&request, mode, &session))
                .await?
        } else {
            response
        };

        if !response.is_success() {
            return Err(ApiError::from_status(&request.url, response.status, &response.body));
        }
        Ok(response)
    }
}
