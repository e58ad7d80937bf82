//! Portal client: login, site discovery, and resource listing.
//!
//! Everything here speaks to the course portal over HTTP. The
//! [`SessionAuthenticator`] produces a [`Session`], which [`SiteDiscovery`]
//! and [`ResourceCatalog`] use to enumerate what should be on disk.

mod auth;
mod catalog;
mod endpoints;
mod html;
mod reject;
mod session;
mod sites;
mod types;

pub use auth::SessionAuthenticator;
pub use catalog::ResourceCatalog;
pub use endpoints::{
    DEFAULT_ACCEPT_PATH, DEFAULT_ACCEPT_REF_PREFIX, DEFAULT_LOGIN_PATH, DEFAULT_REJECTION_MESSAGE,
    DEFAULT_RESOURCES_PATH, DEFAULT_SITES_PATH, DEFAULT_SUBMIT_LABEL, PortalEndpoints,
};
pub use reject::{LINK_MIME_TYPE, RejectPolicy};
pub use session::{HttpSettings, Session};
pub use sites::{SiteDiscovery, term_descriptor};
pub use types::{Resource, Site};

pub(crate) use session::{Redirects, build_client};
