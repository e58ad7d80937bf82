//! Site and resource records decoded from the portal's JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A course site the account is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Portal site id.
    pub id: String,
    /// Site title, e.g. `[2026後期月1]Statistical Physics`.
    pub title: String,
    /// Creation time, when the portal reports one (epoch milliseconds on the wire).
    #[serde(
        rename = "createdDate",
        default,
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// A downloadable resource published on a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Resource title; also the destination file name.
    pub title: String,
    /// MIME type, or a portal pseudo-type such as `text/url`.
    pub mime_type: String,
    /// Size in bytes advertised by the catalog.
    pub size_bytes: u64,
    /// Absolute download URL.
    pub url: String,
    /// Opaque last-modified marker compared against the ledger.
    pub last_modified: String,
    /// Id of the site that owns this resource.
    pub site_id: String,
    /// Title of the owning site; used as the destination folder.
    pub site_title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SiteCollection {
    #[serde(rename = "site_collection", default)]
    pub(crate) sites: Vec<Site>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentCollection {
    #[serde(rename = "content_collection", default)]
    pub(crate) entries: Vec<ContentEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentEntry {
    pub(crate) title: String,
    #[serde(rename = "type", default)]
    pub(crate) mime_type: String,
    #[serde(default)]
    pub(crate) size: u64,
    pub(crate) url: String,
    #[serde(rename = "modifiedDate", default)]
    pub(crate) modified_date: String,
}

impl ContentEntry {
    pub(crate) fn into_resource(self, site: &Site) -> Resource {
        Resource {
            title: self.title,
            mime_type: self.mime_type,
            size_bytes: self.size,
            url: self.url,
            last_modified: self.modified_date,
            site_id: site.id.clone(),
            site_title: site.title.clone(),
        }
    }
}
