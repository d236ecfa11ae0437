// ── Alert event source ──
//
// The seam between the monitor and the backend. `CareClient` implements it
// for real deployments; tests substitute a scripted fake.

use std::future::Future;

use tracing::debug;

use carewatch_api::transport::{TlsMode, TransportConfig};
use carewatch_api::{AlertEvent, CareClient, HandlingRequest, ResolveRequest};

use crate::config::{AuthCredentials, ClientConfig, TlsVerification};
use crate::error::CoreError;

/// Backend operations the alarm monitor depends on.
pub trait AlertEventSource: Send + Sync + 'static {
    fn list_unresolved(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<AlertEvent>, carewatch_api::Error>> + Send;

    fn mark_in_progress(
        &self,
        id: &str,
        handling: &HandlingRequest,
    ) -> impl Future<Output = Result<(), carewatch_api::Error>> + Send;

    fn release(&self, id: &str) -> impl Future<Output = Result<(), carewatch_api::Error>> + Send;

    fn resolve(
        &self,
        id: &str,
        resolution: &ResolveRequest,
    ) -> impl Future<Output = Result<(), carewatch_api::Error>> + Send;
}

impl AlertEventSource for CareClient {
    async fn list_unresolved(&self, limit: u32) -> Result<Vec<AlertEvent>, carewatch_api::Error> {
        self.list_unresolved_alert_events(limit).await
    }

    async fn mark_in_progress(
        &self,
        id: &str,
        handling: &HandlingRequest,
    ) -> Result<(), carewatch_api::Error> {
        self.mark_alert_event_in_progress(id, handling).await
    }

    async fn release(&self, id: &str) -> Result<(), carewatch_api::Error> {
        self.release_alert_event(id).await
    }

    async fn resolve(&self, id: &str, resolution: &ResolveRequest) -> Result<(), carewatch_api::Error> {
        self.resolve_alert_event(id, resolution).await
    }
}

/// Build a client for `config` and authenticate it.
///
/// A configured token is installed as is; email + password are exchanged
/// for a token with one login call.
pub async fn connect(config: &ClientConfig) -> Result<CareClient, CoreError> {
    let transport = build_transport(config);
    let client = CareClient::new(config.url.clone(), &transport)?;

    match &config.auth {
        AuthCredentials::Token(token) => {
            client.set_token(token.clone());
            debug!("using configured access token");
        }
        AuthCredentials::Login { email, password } => {
            client.login(email, password).await?;
            debug!("login successful");
        }
        AuthCredentials::Anonymous => {
            debug!("no credentials configured -- requests are unauthenticated");
        }
    }

    Ok(client)
}

/// Build a [`TransportConfig`] from the client configuration.
fn build_transport(config: &ClientConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
