// Bearer-token authentication
//
// `POST /auth/token` exchanges email + password for an access token. The
// token is stored on the client and attached to every later request.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::client::CareClient;
use crate::error::Error;

/// Login request body.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Tokens returned by a successful login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    #[serde(alias = "access_token", deserialize_with = "secret")]
    pub access_token: SecretString,
    #[serde(default, alias = "refresh_token", deserialize_with = "optional_secret")]
    pub refresh_token: Option<SecretString>,
    /// Profile of the authenticated staff member, shape is backend-defined.
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl CareClient {
    /// Log in with email and password.
    ///
    /// On success the access token is stored on this client and the full
    /// token set is returned so callers can cache it.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<AuthTokens, Error> {
        let url = self.endpoint(&["auth", "token"])?;
        debug!(email, "logging in");

        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let tokens: AuthTokens = self.post_public(url, &body).await?;

        self.set_token(tokens.access_token.clone());
        debug!("login successful");
        Ok(tokens)
    }
}
