//! Type-based exclusion of catalog entries.

use serde::{Deserialize, Serialize};

/// Portal pseudo-type for link entries; never downloadable.
pub const LINK_MIME_TYPE: &str = "text/url";

const SPREADSHEET_SUBTYPES: &[&str] = &[
    "vnd.ms-excel",
    "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "vnd.oasis.opendocument.spreadsheet",
];

const PRESENTATION_SUBTYPES: &[&str] = &[
    "vnd.ms-powerpoint",
    "vnd.openxmlformats-officedocument.presentationml.presentation",
    "vnd.oasis.opendocument.presentation",
];

const DOCUMENT_SUBTYPES: &[&str] = &[
    "msword",
    "vnd.openxmlformats-officedocument.wordprocessingml.document",
    "vnd.oasis.opendocument.text",
];

/// Categories of resources the user chose not to sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectPolicy {
    /// Skip `video/*`.
    pub video: bool,
    /// Skip `audio/*`.
    pub audio: bool,
    /// Skip Excel / OpenDocument spreadsheets.
    pub spreadsheet: bool,
    /// Skip PowerPoint / OpenDocument presentations.
    pub presentation: bool,
    /// Skip Word / OpenDocument text documents.
    pub document: bool,
}

impl RejectPolicy {
    /// Returns true if a resource with this MIME type must not be synced.
    ///
    /// Link entries and anything that is not a `type/subtype` pair (portal
    /// folders use dotted pseudo-types) are always rejected.
    #[must_use]
    pub fn rejects(&self, mime_type: &str) -> bool {
        if mime_type == LINK_MIME_TYPE {
            return true;
        }

        let mut parts = mime_type.split('/');
        let (Some(group), Some(sub), None) = (parts.next(), parts.next(), parts.next()) else {
            return true;
        };

        (self.video && group == "video")
            || (self.audio && group == "audio")
            || (self.spreadsheet && SPREADSHEET_SUBTYPES.contains(&sub))
            || (self.presentation && PRESENTATION_SUBTYPES.contains(&sub))
            || (self.document && DOCUMENT_SUBTYPES.contains(&sub))
    }
}
