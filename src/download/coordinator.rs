//! Parallel fetching of catalog resources.
//!
//! Each resource is fetched in its own task. A `200` is streamed to a file
//! from the [`DestinationResolver`] and its length checked against the
//! catalog size. A `302` means the resource is gated: the acceptance endpoint
//! is called and the GET repeated, as many rounds as the [`RetryPolicy`]
//! allows. Failures are collected per resource and never cancel siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::constants::WRITE_BUFFER_BYTES;
use super::destination::{Destination, DestinationResolver};
use super::retry::RetryPolicy;
use crate::error::SyncError;
use crate::fan_out::fan_out;
use crate::portal::{Resource, Session};

/// Result of a fetch batch.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Resources whose bytes were fully and correctly written, with their paths.
    pub succeeded: Vec<(Resource, PathBuf)>,
    /// One error per failed resource.
    pub errors: Vec<SyncError>,
}

/// Downloads resources in parallel.
#[derive(Clone)]
pub struct FetchCoordinator {
    destination: Arc<dyn DestinationResolver>,
    retry_policy: RetryPolicy,
    max_concurrency: usize,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("retry_policy", &self.retry_policy)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

impl FetchCoordinator {
    /// Creates a coordinator writing through `destination`.
    #[must_use]
    pub fn new(
        destination: Arc<dyn DestinationResolver>,
        retry_policy: RetryPolicy,
        max_concurrency: usize,
    ) -> Self {
        Self {
            destination,
            retry_policy,
            max_concurrency,
        }
    }

    /// Fetches every resource, one task each, and reports what succeeded.
    ///
    /// A task still running at `deadline` is abandoned and reported as
    /// [`SyncError::TimedOut`]; its partial file is removed.
    #[instrument(skip_all, fields(resources = resources.len()))]
    pub async fn fetch_all(
        &self,
        session: &Session,
        resources: Vec<Resource>,
        deadline: Instant,
    ) -> FetchReport {
        let coordinator = self.clone();
        let session = session.clone();
        let results = fan_out(resources, self.max_concurrency, move |resource| {
            let coordinator = coordinator.clone();
            let session = session.clone();
            async move {
                let outcome =
                    tokio::time::timeout_at(deadline, coordinator.fetch(&session, &resource))
                        .await
                        .unwrap_or_else(|_| {
                            Err(SyncError::timed_out(format!("fetch of {}", resource.title)))
                        });
                (resource, outcome)
            }
        })
        .await;

        let mut report = FetchReport::default();
        for (resource, outcome) in results {
            match outcome {
                Ok(path) => report.succeeded.push((resource, path)),
                Err(e) => {
                    warn!(site_id = %resource.site_id, title = %resource.title, error = %e, "fetch failed");
                    report.errors.push(e);
                }
            }
        }
        info!(
            succeeded = report.succeeded.len(),
            failed = report.errors.len(),
            "fetch batch complete"
        );
        report
    }

    /// Fetches one resource and returns the path it was written to.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Network`] on transport failure
    /// - [`SyncError::ServiceUnavailable`] on any status other than 200, or a
    ///   302 that persists after the acceptance rounds
    /// - [`SyncError::DataIntegrity`] if the byte count differs from the catalog size
    /// - [`SyncError::Io`] if the destination cannot be created or written
    #[instrument(skip_all, fields(site_id = %resource.site_id, title = %resource.title))]
    pub async fn fetch(&self, session: &Session, resource: &Resource) -> Result<PathBuf, SyncError> {
        let mut round = 0;
        loop {
            let response = session.get(&resource.url).await?;
            match response.status() {
                StatusCode::OK => return self.write(resource, response).await,
                StatusCode::FOUND => {
                    round += 1;
                    let Some(delay) = self.retry_policy.delay_before(round) else {
                        return Err(SyncError::service_unavailable(
                            &resource.url,
                            StatusCode::FOUND.as_u16(),
                        ));
                    };
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    accept(session, resource).await?;
                }
                status => {
                    return Err(SyncError::service_unavailable(
                        &resource.url,
                        status.as_u16(),
                    ));
                }
            }
        }
    }

    async fn write(
        &self,
        resource: &Resource,
        response: reqwest::Response,
    ) -> Result<PathBuf, SyncError> {
        let Destination { path, mut file } = self
            .destination
            .create(&resource.title, &resource.site_title)
            .await
            .map_err(|e| {
                SyncError::io(Path::new(&resource.site_title).join(&resource.title), e)
            })?;
        let guard = PartialFile::new(path.clone());

        let written = stream_to_file(&mut file, response, &resource.url, &path).await?;
        drop(file);

        if written != resource.size_bytes {
            return Err(SyncError::DataIntegrity {
                title: resource.title.clone(),
                path,
                expected: resource.size_bytes,
                actual: written,
            });
        }

        guard.keep();
        debug!(path = %path.display(), bytes = written, "resource written");
        Ok(path)
    }
}

/// Calls the acceptance endpoint for a gated resource. Its body and status are ignored.
async fn accept(session: &Session, resource: &Resource) -> Result<(), SyncError> {
    let url = session
        .endpoints()
        .accept(&resource.site_id, &resource.title)?;
    let response = session.get(url.as_str()).await?;
    debug!(status = response.status().as_u16(), "acceptance requested");
    Ok(())
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, SyncError> {
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| SyncError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| SyncError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| SyncError::io(file_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(|e| SyncError::io(file_path, e))?;

    Ok(bytes_written)
}

/// Removes a destination file on drop unless [`keep`](Self::keep) was called.
///
/// Covers early returns and task cancellation alike.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn keep(mut self) {
        self.path = None;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            debug!(path = %path.display(), "cleaning up partial file");
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove partial file");
            }
        }
    }
}
