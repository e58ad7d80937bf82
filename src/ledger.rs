//! Persisted record of what has already been synced.
//!
//! The ledger maps site id to resource title to the last-modified marker
//! seen when that resource was last written successfully. It is stored as
//! 2-space indented JSON:
//!
//! ```json
//! {
//!   "S1": {
//!     "R1": "T1"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::portal::Resource;

/// File name of the ledger inside the download directory.
pub const LEDGER_FILE_NAME: &str = "download-ledger.json";

type Entries = BTreeMap<String, BTreeMap<String, String>>;

/// In-memory ledger bound to its backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLedger {
    path: PathBuf,
    entries: Entries,
}

impl DownloadLedger {
    /// Conventional ledger location inside `dir`.
    #[must_use]
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(LEDGER_FILE_NAME)
    }

    /// An empty ledger that will be saved to `path`.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Entries::new(),
        }
    }

    /// Loads the ledger at `path`.
    ///
    /// A missing, unreadable, or corrupt file yields an empty ledger; this never fails.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger yet, starting empty");
                return Self::empty(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger unreadable, starting empty");
                return Self::empty(path);
            }
        };

        match serde_json::from_slice::<Entries>(&raw) {
            Ok(entries) => {
                debug!(path = %path.display(), sites = entries.len(), "ledger loaded");
                Self { path, entries }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger corrupt, starting empty");
                Self::empty(path)
            }
        }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored marker for a resource, if any.
    #[must_use]
    pub fn marker(&self, site_id: &str, title: &str) -> Option<&str> {
        self.entries
            .get(site_id)
            .and_then(|titles| titles.get(title))
            .map(String::as_str)
    }

    /// Number of recorded resources across all sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resources that are new or whose marker changed since they were last written.
    #[must_use]
    pub fn diff(&self, catalog: &[Resource]) -> Vec<Resource> {
        catalog
            .iter()
            .filter(|r| self.marker(&r.site_id, &r.title) != Some(r.last_modified.as_str()))
            .cloned()
            .collect()
    }

    /// Records `resource` as written with its current marker.
    pub fn record(&mut self, resource: &Resource) {
        self.entries
            .entry(resource.site_id.clone())
            .or_default()
            .insert(resource.title.clone(), resource.last_modified.clone());
    }

    /// Records every confirmed write and persists the ledger.
    ///
    /// Only pass resources whose bytes were fully and correctly written.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Ledger`] if the file cannot be written.
    pub async fn commit<'a, I>(&mut self, succeeded: I) -> Result<(), SyncError>
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        let mut recorded = 0_usize;
        for resource in succeeded {
            self.record(resource);
            recorded += 1;
        }
        self.save().await?;
        info!(recorded, total = self.len(), "ledger committed");
        Ok(())
    }

    /// Writes the ledger atomically (temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Ledger`] if the file cannot be written.
    pub async fn save(&self) -> Result<(), SyncError> {
        let ledger_error = |source| SyncError::Ledger {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ledger_error(io::Error::other(e)))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(ledger_error)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).await.map_err(ledger_error)?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(ledger_error)?;
        debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}
