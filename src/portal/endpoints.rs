//! URL construction for the portal API surface.

use url::Url;

use crate::error::SyncError;

/// Default login entry point; visiting it binds an anonymous session and
/// redirects to the SSO login form.
pub const DEFAULT_LOGIN_PATH: &str = "/sakai-login-tool/container";
/// Default all-sites listing.
pub const DEFAULT_SITES_PATH: &str = "/direct/site.json";
/// Default per-site resource listing; `{site_id}` is substituted.
pub const DEFAULT_RESOURCES_PATH: &str = "/direct/content/site/{site_id}.json";
/// Default acceptance endpoint for copyright-gated resources.
pub const DEFAULT_ACCEPT_PATH: &str = "/access/accept";
/// Default prefix of the `ref`/`url` acceptance parameters.
pub const DEFAULT_ACCEPT_REF_PREFIX: &str = "/content/group";
/// Text of the SSO `#msg` element when credentials are rejected.
pub const DEFAULT_REJECTION_MESSAGE: &str =
    "あなたが入力した認証情報は，認証可能なものであることが確認できませんでした．";
/// Label of the SSO form's submit button.
pub const DEFAULT_SUBMIT_LABEL: &str = "ログイン";

const SITE_ID_PLACEHOLDER: &str = "{site_id}";

/// Locations of every portal endpoint the engine talks to.
///
/// Paths are appended to the base URL verbatim, so the base should be an
/// origin such as `https://portal.example.ac.jp`.
#[derive(Debug, Clone)]
pub struct PortalEndpoints {
    base: String,
    login_path: String,
    sso_url: Option<String>,
    sites_path: String,
    resources_path: String,
    accept_path: String,
    accept_ref_prefix: String,
    rejection_message: String,
    submit_label: String,
}

impl PortalEndpoints {
    /// Creates endpoints for a portal using the default paths.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotConfigured`] if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| SyncError::not_configured(format!("invalid portal URL {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::not_configured(format!(
                "portal URL must be http(s): {base_url}"
            )));
        }

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            sso_url: None,
            sites_path: DEFAULT_SITES_PATH.to_string(),
            resources_path: DEFAULT_RESOURCES_PATH.to_string(),
            accept_path: DEFAULT_ACCEPT_PATH.to_string(),
            accept_ref_prefix: DEFAULT_ACCEPT_REF_PREFIX.to_string(),
            rejection_message: DEFAULT_REJECTION_MESSAGE.to_string(),
            submit_label: DEFAULT_SUBMIT_LABEL.to_string(),
        })
    }

    /// Overrides the login entry path.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Overrides the SSO endpoint (absolute URL).
    #[must_use]
    pub fn with_sso_url(mut self, url: impl Into<String>) -> Self {
        self.sso_url = Some(url.into());
        self
    }

    /// Overrides the all-sites listing path.
    #[must_use]
    pub fn with_sites_path(mut self, path: impl Into<String>) -> Self {
        self.sites_path = path.into();
        self
    }

    /// Overrides the per-site resource listing path (must contain `{site_id}`).
    #[must_use]
    pub fn with_resources_path(mut self, path: impl Into<String>) -> Self {
        self.resources_path = path.into();
        self
    }

    /// Overrides the acceptance endpoint path.
    #[must_use]
    pub fn with_accept_path(mut self, path: impl Into<String>) -> Self {
        self.accept_path = path.into();
        self
    }

    /// Overrides the `ref`/`url` prefix used by the acceptance flow.
    #[must_use]
    pub fn with_accept_ref_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.accept_ref_prefix = prefix.into();
        self
    }

    /// Overrides the rejection message expected in the SSO `#msg` element.
    #[must_use]
    pub fn with_rejection_message(mut self, message: impl Into<String>) -> Self {
        self.rejection_message = message.into();
        self
    }

    /// Overrides the submit label posted with the login form.
    #[must_use]
    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    /// Portal root, used by the liveness check.
    #[must_use]
    pub fn root(&self) -> String {
        format!("{}/", self.base)
    }

    /// Login entry point.
    #[must_use]
    pub fn login_entry(&self) -> String {
        self.join(&self.login_path)
    }

    /// SSO login endpoint the credentials are posted to.
    ///
    /// Defaults to `{base}/cas/login?service=<login entry>`.
    #[must_use]
    pub fn sso(&self) -> String {
        self.sso_url.clone().unwrap_or_else(|| {
            format!(
                "{}/cas/login?service={}",
                self.base,
                urlencoding::encode(&self.login_entry())
            )
        })
    }

    /// All-sites listing.
    #[must_use]
    pub fn sites(&self) -> String {
        self.join(&self.sites_path)
    }

    /// Resource listing for one site.
    #[must_use]
    pub fn site_resources(&self, site_id: &str) -> String {
        let path = self
            .resources_path
            .replace(SITE_ID_PLACEHOLDER, &urlencoding::encode(site_id));
        self.join(&path)
    }

    /// Acceptance URL that unlocks a copyright-gated resource.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnexpectedResponse`] if the configured accept path
    /// does not form a valid URL.
    pub fn accept(&self, site_id: &str, resource_title: &str) -> Result<Url, SyncError> {
        let raw = self.join(&self.accept_path);
        let mut url = Url::parse(&raw)
            .map_err(|e| SyncError::unexpected(raw.clone(), format!("invalid accept URL: {e}")))?;
        let reference = format!(
            "{}/{site_id}/{resource_title}",
            self.accept_ref_prefix.trim_end_matches('/')
        );
        url.query_pairs_mut()
            .append_pair("ref", &reference)
            .append_pair("url", &reference);
        Ok(url)
    }

    /// Expected rejection message text.
    #[must_use]
    pub fn rejection_message(&self) -> &str {
        &self.rejection_message
    }

    /// Submit label for the login form.
    #[must_use]
    pub fn submit_label(&self) -> &str {
        &self.submit_label
    }

    fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_non_http_base() {
        assert!(PortalEndpoints::new("ftp://portal.example").is_err());
        assert!(PortalEndpoints::new("not a url").is_err());
    }

    #[test]
    fn test_default_paths() {
        let endpoints = PortalEndpoints::new("https://portal.example/").unwrap();
        assert_eq!(endpoints.root(), "https://portal.example/");
        assert_eq!(endpoints.sites(), "https://portal.example/direct/site.json");
        assert_eq!(
            endpoints.site_resources("2026-110-N1"),
            "https://portal.example/direct/content/site/2026-110-N1.json"
        );
        assert_eq!(
            endpoints.login_entry(),
            "https://portal.example/sakai-login-tool/container"
        );
    }

    #[test]
    fn test_default_sso_carries_service_parameter() {
        let endpoints = PortalEndpoints::new("https://portal.example").unwrap();
        let sso = Url::parse(&endpoints.sso()).unwrap();
        assert_eq!(sso.path(), "/cas/login");
        let service = sso
            .query_pairs()
            .find(|(k, _)| k == "service")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(service, endpoints.login_entry());
    }

    #[test]
    fn test_accept_builds_matching_ref_and_url() {
        let endpoints = PortalEndpoints::new("https://portal.example").unwrap();
        let url = endpoints.accept("S1", "week 1 slides.pdf").unwrap();
        assert_eq!(url.path(), "/access/accept");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "ref".to_string(),
                    "/content/group/S1/week 1 slides.pdf".to_string()
                ),
                (
                    "url".to_string(),
                    "/content/group/S1/week 1 slides.pdf".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_overrides() {
        let endpoints = PortalEndpoints::new("http://127.0.0.1:9000")
            .unwrap()
            .with_sites_path("/sites.json")
            .with_resources_path("/site/{site_id}/resources.json")
            .with_sso_url("http://127.0.0.1:9000/sso");
        assert_eq!(endpoints.sites(), "http://127.0.0.1:9000/sites.json");
        assert_eq!(
            endpoints.site_resources("S1"),
            "http://127.0.0.1:9000/site/S1/resources.json"
        );
        assert_eq!(endpoints.sso(), "http://127.0.0.1:9000/sso");
    }
}
