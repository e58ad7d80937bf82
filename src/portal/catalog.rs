//! Per-site resource listing.

use tracing::{debug, info, instrument};

use super::reject::RejectPolicy;
use super::session::Session;
use super::types::{ContentCollection, Resource, Site};
use crate::error::SyncError;
use crate::fan_out::fan_out;

/// Lists the downloadable resources of course sites.
#[derive(Debug, Clone, Copy)]
pub struct ResourceCatalog {
    policy: RejectPolicy,
    max_concurrency: usize,
}

impl ResourceCatalog {
    /// Creates a catalog that filters with `policy` and lists up to
    /// `max_concurrency` sites at once.
    #[must_use]
    pub fn new(policy: RejectPolicy, max_concurrency: usize) -> Self {
        Self {
            policy,
            max_concurrency,
        }
    }

    /// Lists one site's resources, tagged with the site and filtered by policy.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`] / [`SyncError::ServiceUnavailable`] on transport
    /// failure or a non-200 listing, [`SyncError::UnexpectedResponse`] on bad JSON.
    #[instrument(skip(self, session, site), fields(site_id = %site.id))]
    pub async fn list(&self, session: &Session, site: &Site) -> Result<Vec<Resource>, SyncError> {
        let url = session.endpoints().site_resources(&site.id);
        let collection: ContentCollection = session.get_json(&url).await?;

        let total = collection.entries.len();
        let resources: Vec<Resource> = collection
            .entries
            .into_iter()
            .filter(|entry| !self.policy.rejects(&entry.mime_type))
            .map(|entry| entry.into_resource(site))
            .collect();
        debug!(total, kept = resources.len(), "listed site resources");
        Ok(resources)
    }

    /// Lists every site in parallel and returns the combined catalog.
    ///
    /// All listings run to completion before results are inspected. If any
    /// site failed, the first failure is returned and no partial catalog is
    /// produced.
    ///
    /// # Errors
    ///
    /// Returns the first per-site error, see [`list`](Self::list).
    #[instrument(skip_all, fields(sites = sites.len()))]
    pub async fn list_all(
        &self,
        session: &Session,
        sites: Vec<Site>,
    ) -> Result<Vec<Resource>, SyncError> {
        let site_count = sites.len();
        let sites_url = session.endpoints().sites();
        let catalog = *self;
        let session = session.clone();
        let results = fan_out(sites, self.max_concurrency, move |site| {
            let session = session.clone();
            async move { catalog.list(&session, &site).await }
        })
        .await;

        let resources = merge_listings(results, site_count, &sites_url)?;
        info!(resources = resources.len(), "catalog complete");
        Ok(resources)
    }
}

/// Combines per-site listings; any failed or missing listing fails the whole catalog.
fn merge_listings(
    results: Vec<Result<Vec<Resource>, SyncError>>,
    site_count: usize,
    sites_url: &str,
) -> Result<Vec<Resource>, SyncError> {
    if results.len() != site_count {
        return Err(SyncError::unexpected(
            sites_url,
            format!(
                "{} of {site_count} site listings did not complete",
                site_count - results.len()
            ),
        ));
    }

    let mut resources = Vec::new();
    for result in results {
        resources.extend(result?);
    }
    Ok(resources)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::portal::endpoints::PortalEndpoints;
    use crate::portal::session::{HttpSettings, Redirects, build_client};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn site(id: &str) -> Site {
        Site {
            id: id.to_string(),
            title: format!("[2026後期]{id}"),
            created_at: None,
        }
    }

    fn session_for(server: &MockServer) -> Session {
        let endpoints = Arc::new(PortalEndpoints::new(&server.uri()).unwrap());
        let client = build_client(None, HttpSettings::default(), Redirects::Manual).unwrap();
        Session::new(client, endpoints)
    }

    async fn mount_listing(server: &MockServer, site_id: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/direct/content/site/{site_id}.json")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_filters_and_tags() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "S1",
            r#"{"content_collection":[
                {"title":"R1","type":"application/pdf","size":5,"url":"http://x/R1","modifiedDate":"T1"},
                {"title":"link","type":"text/url","size":0,"url":"http://x/l","modifiedDate":"T1"},
                {"title":"lecture","type":"video/mp4","size":9,"url":"http://x/v","modifiedDate":"T1"},
                {"title":"folder","type":"org.sakaiproject.content.types.folder","size":0,"url":"http://x/f/","modifiedDate":"T1"}
            ]}"#,
        )
        .await;

        let catalog = ResourceCatalog::new(
            RejectPolicy {
                video: true,
                ..RejectPolicy::default()
            },
            4,
        );
        let resources = catalog.list(&session_for(&server), &site("S1")).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].title, "R1");
        assert_eq!(resources[0].site_id, "S1");
    }

    #[tokio::test]
    async fn test_list_all_aborts_on_any_site_failure() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "S1",
            r#"{"content_collection":[{"title":"R1","type":"application/pdf","size":5,"url":"http://x/R1","modifiedDate":"T1"}]}"#,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/direct/content/site/S2.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let catalog = ResourceCatalog::new(RejectPolicy::default(), 4);
        let result = catalog
            .list_all(&session_for(&server), vec![site("S1"), site("S2")])
            .await;
        assert!(matches!(
            result,
            Err(SyncError::ServiceUnavailable { status: 500, .. })
        ));
    }

    #[test]
    fn test_missing_listing_fails_catalog() {
        let listed = vec![Ok(Vec::new())];
        let err = merge_listings(listed, 2, "https://portal.example/direct/site.json").unwrap_err();
        assert!(matches!(err, SyncError::UnexpectedResponse { .. }), "got {err:?}");
        assert!(err.to_string().contains("1 of 2"), "got {err}");
    }

    #[test]
    fn test_complete_listings_merge() {
        let resource = Resource {
            title: "R1".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 1,
            url: "http://x/R1".to_string(),
            last_modified: "T1".to_string(),
            site_id: "S1".to_string(),
            site_title: "Site".to_string(),
        };
        let merged = merge_listings(
            vec![Ok(vec![resource.clone()]), Ok(Vec::new())],
            2,
            "https://portal.example/direct/site.json",
        )
        .unwrap();
        assert_eq!(merged, vec![resource]);
    }

    #[tokio::test]
    async fn test_list_all_combines_sites() {
        let server = MockServer::start().await;
        for id in ["S1", "S2"] {
            mount_listing(
                &server,
                id,
                &format!(
                    r#"{{"content_collection":[{{"title":"R-{id}","type":"application/pdf","size":1,"url":"http://x/{id}","modifiedDate":"T"}}]}}"#
                ),
            )
            .await;
        }

        let catalog = ResourceCatalog::new(RejectPolicy::default(), 1);
        let mut titles: Vec<String> = catalog
            .list_all(&session_for(&server), vec![site("S1"), site("S2")])
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["R-S1", "R-S2"]);
    }
}
