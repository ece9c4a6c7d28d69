use serde::Deserialize;

/// Response from the OAuth2 client-credentials exchange.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
}

/// Response from `/API/Authentication/v1.0/Login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "APIResponse", default)]
    pub api_response: LoginBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Token", default)]
    pub token: Option<String>,
}

impl LoginResponse {
    /// The cookie token, present only when the login reported `SUCCESS`.
    pub fn cookie_token(&self) -> Option<&str> {
        if self.api_response.code != "SUCCESS" {
            return None;
        }
        self.api_response
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}
