//! Authenticated HTTP session and client construction.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder, Response, StatusCode, redirect};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::endpoints::PortalEndpoints;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use crate::error::SyncError;
use crate::user_agent;

/// Timeouts applied to every request a session makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout, body included.
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Whether a client follows redirects on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Redirects {
    Follow,
    Manual,
}

/// An authenticated portal session.
///
/// Produced by [`SessionAuthenticator`](super::SessionAuthenticator) and owned
/// by a single sync run. The underlying client never follows redirects, so the
/// acceptance flow can see `302` responses.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    endpoints: Arc<PortalEndpoints>,
}

impl Session {
    pub(crate) fn new(client: Client, endpoints: Arc<PortalEndpoints>) -> Self {
        Self { client, endpoints }
    }

    /// Endpoints this session talks to.
    #[must_use]
    pub fn endpoints(&self) -> &PortalEndpoints {
        &self.endpoints
    }

    /// Sends a GET without following redirects.
    pub(crate) async fn get(&self, url: &str) -> Result<Response, SyncError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::network(url, e))
    }

    /// GETs a JSON document, requiring a `200 OK`.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SyncError> {
        let response = self.get(url).await?;
        let status = response.status();
        if status != StatusCode::OK {
            debug!(url, status = status.as_u16(), "listing request not OK");
            return Err(SyncError::service_unavailable(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::network(url, e))?;
        serde_json::from_slice(&body)
            .map_err(|e| SyncError::unexpected(url, format!("malformed JSON: {e}")))
    }
}

/// Builds a client sharing `jar`, with the given redirect behaviour.
pub(crate) fn build_client(
    jar: Option<Arc<Jar>>,
    settings: HttpSettings,
    redirects: Redirects,
) -> Result<Client, reqwest::Error> {
    base_client_builder(jar, settings, redirects).build()
}

fn base_client_builder(
    jar: Option<Arc<Jar>>,
    settings: HttpSettings,
    redirects: Redirects,
) -> ClientBuilder {
    let policy = match redirects {
        Redirects::Follow => redirect::Policy::limited(10),
        Redirects::Manual => redirect::Policy::none(),
    };
    let mut builder = Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .gzip(true)
        .redirect(policy)
        .user_agent(user_agent::default_user_agent());
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }
    builder
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_for(server: &MockServer) -> Session {
        let endpoints = Arc::new(PortalEndpoints::new(&server.uri()).unwrap());
        let client = build_client(None, HttpSettings::default(), Redirects::Manual).unwrap();
        Session::new(client, endpoints)
    }

    #[tokio::test]
    async fn test_get_does_not_follow_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gated"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "/elsewhere"),
            )
            .mount(&server)
            .await;

        let session = session_for(&server);
        let response = session
            .get(&format!("{}/gated", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 302);
    }

    #[tokio::test]
    async fn test_get_json_non_200_is_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/direct/site.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let url = session.endpoints().sites();
        let result: Result<serde_json::Value, _> = session.get_json(&url).await;
        assert!(matches!(
            result,
            Err(SyncError::ServiceUnavailable { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_json_malformed_is_unexpected_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/direct/site.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let url = session.endpoints().sites();
        let result: Result<serde_json::Value, _> = session.get_json(&url).await;
        assert!(matches!(result, Err(SyncError::UnexpectedResponse { .. })));
    }
}
