//! SSO login producing an authenticated [`Session`].
//!
//! The flow is: liveness check, login entry (binds an anonymous session
//! cookie and serves the SSO form), ticket scrape, credential POST, result
//! page inspection. Redirects are followed during login and disabled on the
//! returned session; both clients share one cookie jar.

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::endpoints::PortalEndpoints;
use super::html;
use super::session::{HttpSettings, Redirects, Session, build_client};
use crate::error::{Secret, SyncError};

const LOGIN_TICKET_FIELD: &str = "lt";
const EVENT_ID: &str = "submit";
const EXECUTION_STAGE: &str = "e1s1";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// What the SSO result page says about a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoginOutcome {
    Accepted,
    Rejected,
    /// A message element was present but did not carry the known rejection text.
    Unrecognized(String),
}

/// Logs an account into the portal.
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    endpoints: Arc<PortalEndpoints>,
    http: HttpSettings,
}

impl SessionAuthenticator {
    /// Creates an authenticator for the given portal.
    #[must_use]
    pub fn new(endpoints: Arc<PortalEndpoints>, http: HttpSettings) -> Self {
        Self { endpoints, http }
    }

    /// Authenticates `id` / `secret` and returns a session that does not follow redirects.
    ///
    /// No retries are attempted; the caller owns retry policy.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Network`] on transport failure
    /// - [`SyncError::ServiceUnavailable`] if the liveness check or login entry is not OK
    /// - [`SyncError::UnexpectedResponse`] if the login form or result page has changed shape
    /// - [`SyncError::LoginRejected`] if the SSO rejected the credentials
    #[instrument(skip(self, secret), fields(id = %id))]
    pub async fn authenticate(&self, id: &str, secret: &Secret) -> Result<Session, SyncError> {
        self.check_alive().await?;

        let jar = Arc::new(Jar::default());
        let login_client = self.client(Some(Arc::clone(&jar)), Redirects::Follow)?;

        let entry_url = self.endpoints.login_entry();
        let entry = login_client
            .get(&entry_url)
            .send()
            .await
            .map_err(|e| SyncError::network(&entry_url, e))?;
        let status = entry.status();
        if !status.is_success() {
            return Err(SyncError::service_unavailable(&entry_url, status.as_u16()));
        }
        let form_page = entry
            .text()
            .await
            .map_err(|e| SyncError::network(&entry_url, e))?;

        let ticket = html::input_value(&form_page, LOGIN_TICKET_FIELD).ok_or_else(|| {
            SyncError::unexpected(&entry_url, "login ticket field not found on login page")
        })?;
        debug!("login ticket acquired");

        let sso_url = self.endpoints.sso();
        let body = login_form(&ticket, id, secret, self.endpoints.submit_label());
        let response = login_client
            .post(&sso_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| SyncError::network(&sso_url, e))?;
        let status = response.status();
        let result_page = response
            .text()
            .await
            .map_err(|e| SyncError::network(&sso_url, e))?;

        match login_outcome(&result_page, self.endpoints.rejection_message()) {
            LoginOutcome::Rejected => {
                warn!("SSO rejected the credentials");
                return Err(SyncError::LoginRejected {
                    id: id.to_string(),
                    secret: secret.clone(),
                });
            }
            LoginOutcome::Unrecognized(message) => {
                return Err(SyncError::unexpected(
                    &sso_url,
                    format!("unrecognized login message: {message}"),
                ));
            }
            LoginOutcome::Accepted if !status.is_success() => {
                return Err(SyncError::service_unavailable(&sso_url, status.as_u16()));
            }
            LoginOutcome::Accepted => {}
        }

        let session_client = self.client(Some(jar), Redirects::Manual)?;
        info!("logged in");
        Ok(Session::new(session_client, Arc::clone(&self.endpoints)))
    }

    /// HEADs the portal root without following redirects; anything but 200 fails.
    async fn check_alive(&self) -> Result<(), SyncError> {
        let client = self.client(None, Redirects::Manual)?;
        let root = self.endpoints.root();
        let response = client
            .head(&root)
            .send()
            .await
            .map_err(|e| SyncError::network(&root, e))?;
        if response.status() != StatusCode::OK {
            debug!(status = response.status().as_u16(), "liveness check failed");
            return Err(SyncError::service_unavailable(
                &root,
                response.status().as_u16(),
            ));
        }
        Ok(())
    }

    fn client(&self, jar: Option<Arc<Jar>>, redirects: Redirects) -> Result<Client, SyncError> {
        let root = self.endpoints.root();
        build_client(jar, self.http, redirects).map_err(|e| SyncError::network(root, e))
    }
}

fn login_form(ticket: &str, id: &str, secret: &Secret, submit_label: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("_eventId", EVENT_ID)
        .append_pair("execution", EXECUTION_STAGE)
        .append_pair("lt", ticket)
        .append_pair("username", id)
        .append_pair("password", secret.expose())
        .append_pair("submit", submit_label)
        .finish()
}

fn login_outcome(page: &str, rejection_message: &str) -> LoginOutcome {
    match html::message_text(page) {
        None => LoginOutcome::Accepted,
        Some(text) if text == rejection_message => LoginOutcome::Rejected,
        Some(text) => LoginOutcome::Unrecognized(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::endpoints::DEFAULT_REJECTION_MESSAGE;

    #[test]
    fn test_login_form_fields_and_encoding() {
        let body = login_form("LT-1", "a0123456", &Secret::new("p&ss word"), "ログイン");
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("_eventId".to_string(), "submit".to_string()),
                ("execution".to_string(), "e1s1".to_string()),
                ("lt".to_string(), "LT-1".to_string()),
                ("username".to_string(), "a0123456".to_string()),
                ("password".to_string(), "p&ss word".to_string()),
                ("submit".to_string(), "ログイン".to_string()),
            ]
        );
    }

    #[test]
    fn test_login_outcome_three_way() {
        assert_eq!(
            login_outcome("<html><body>Welcome</body></html>", DEFAULT_REJECTION_MESSAGE),
            LoginOutcome::Accepted
        );

        let rejected = format!(r#"<div id="msg" class="errors">{DEFAULT_REJECTION_MESSAGE}</div>"#);
        assert_eq!(
            login_outcome(&rejected, DEFAULT_REJECTION_MESSAGE),
            LoginOutcome::Rejected
        );

        let locked = r#"<div id="msg">Account locked</div>"#;
        assert_eq!(
            login_outcome(locked, DEFAULT_REJECTION_MESSAGE),
            LoginOutcome::Unrecognized("Account locked".to_string())
        );
    }
}
