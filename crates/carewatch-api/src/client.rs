// Backend HTTP client
//
// Wraps `reqwest::Client` with API root normalization, bearer-token
// handling, status classification and tolerant JSON decoding. Endpoint
// groups (auth, alert events) are implemented as inherent methods in
// separate files to keep this module focused on transport mechanics.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error bodies whose `message` carries no information worth surfacing.
const GENERIC_SERVER_MESSAGE: &str = "Internal server error";

/// Maximum number of characters of a raw body quoted in error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// Raw HTTP client for the eldercare backend.
///
/// All endpoints live under a normalized API root (`.../api/v2`). The bearer
/// token is held in memory only; a 401 from any endpoint clears it so the
/// caller is forced through a fresh login.
pub struct CareClient {
    http: reqwest::Client,
    base_url: Url,
    api_root: Url,
    token: RwLock<Option<SecretString>>,
    /// Request timeout the transport was built with, when known.
    timeout: Option<Duration>,
}

impl CareClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` may be a bare origin (`https://care.example.org`), an
    /// `/api` prefix, or a full `/api/v2` root.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            timeout: Some(transport.timeout),
            ..Self::with_client(http, base_url)
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        let api_root = normalize_api_root(&base_url);
        debug!(%api_root, "resolved API root");
        Self {
            http,
            base_url,
            api_root,
            token: RwLock::new(None),
            timeout: None,
        }
    }

    /// The configured server URL, as given.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The normalized API root every endpoint is resolved against.
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    // ── Token management ─────────────────────────────────────────────

    /// Install a bearer token (from a previous login or configuration).
    pub fn set_token(&self, token: SecretString) {
        debug!("storing access token");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Forget the bearer token.
    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a bearer token is currently installed.
    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.token.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => {
                trace!("sending request without access token");
                builder
            }
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build an endpoint URL from path segments under the API root.
    ///
    /// Segments are percent-encoded individually, so caller-supplied IDs
    /// can never escape their path position.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self
            .apply_auth(self.http.get(url))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let resp = self.check_status(resp).await?;
        decode(resp).await
    }

    /// Send an authenticated POST request whose response body is ignored.
    pub(crate) async fn post_action(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("POST {}", url);
        let resp = self
            .apply_auth(self.http.post(url).json(body))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let resp = self.check_status(resp).await?;
        // Drain the body so the connection can be reused.
        let _ = resp.bytes().await;
        Ok(())
    }

    /// Send an unauthenticated POST request and decode the JSON body.
    pub(crate) async fn post_public<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: error_message(status, &body),
            });
        }
        decode(resp).await
    }

    /// Report a transport timeout with the configured duration.
    fn send_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }

    /// Classify the response status.
    ///
    /// 401 clears the stored token, 404 is reported separately so callers
    /// can treat a missing endpoint as a capability gap.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            self.clear_token();
            return Err(Error::Authentication {
                message: "access token expired or invalid".into(),
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                path: resp.url().path().to_owned(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        Ok(resp)
    }
}

/// Normalize a configured server URL to the `/api/v2` root.
///
/// - a base already containing `/api/v2` is used as is;
/// - a base containing `/api` gets `/v2` appended;
/// - a bare origin gets `/api/v2` appended.
pub(crate) fn normalize_api_root(base: &Url) -> Url {
    let mut root = base.clone();
    root.set_query(None);
    root.set_fragment(None);

    let path = root.path().trim_end_matches('/').to_owned();
    let normalized = if path.contains("/api/v2") {
        path
    } else if path.contains("/api") {
        format!("{path}/v2")
    } else {
        format!("{path}/api/v2")
    };
    root.set_path(&normalized);
    root
}

/// Pull a human-readable message out of an error body.
///
/// Prefers `message` (unless it is the generic server placeholder), then
/// `error`, then a preview of the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.filter(|m| m != GENERIC_SERVER_MESSAGE) {
            return message;
        }
        if let Some(error) = parsed.error {
            return error;
        }
    }

    let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    if preview.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned()
    } else {
        preview
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}
