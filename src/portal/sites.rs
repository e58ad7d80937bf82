//! Discovery of the current term's course sites.

use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, instrument};

use super::session::Session;
use super::types::{Site, SiteCollection};
use crate::error::SyncError;

/// Lists the sites that belong to the current academic term.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteDiscovery;

impl SiteDiscovery {
    /// Fetches all sites and keeps those whose title contains today's term descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`] / [`SyncError::ServiceUnavailable`] on transport
    /// failure or a non-200 listing, [`SyncError::UnexpectedResponse`] on a payload
    /// that does not decode.
    #[instrument(skip_all)]
    pub async fn list(&self, session: &Session) -> Result<Vec<Site>, SyncError> {
        self.list_for(session, Local::now().date_naive()).await
    }

    /// Same as [`list`](Self::list) with an explicit "today".
    ///
    /// # Errors
    ///
    /// See [`list`](Self::list).
    pub async fn list_for(&self, session: &Session, today: NaiveDate) -> Result<Vec<Site>, SyncError> {
        let url = session.endpoints().sites();
        let collection: SiteCollection = session.get_json(&url).await?;
        let term = term_descriptor(today);

        let total = collection.sites.len();
        let sites: Vec<Site> = collection
            .sites
            .into_iter()
            .filter(|site| site.title.contains(&term))
            .collect();
        debug!(term = %term, total, kept = sites.len(), "filtered sites by term");
        Ok(sites)
    }
}

/// Term label embedded in site titles, e.g. `2026前期` or `2026後期`.
///
/// January and February belong to the previous year's second term.
#[must_use]
pub fn term_descriptor(today: NaiveDate) -> String {
    let (mut year, month) = (today.year(), today.month());
    if month <= 2 {
        year -= 1;
    }
    if (3..=8).contains(&month) {
        format!("{year}前期")
    } else {
        format!("{year}後期")
    }
}
