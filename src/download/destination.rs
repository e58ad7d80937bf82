//! Where fetched resources are written.
//!
//! [`DestinationResolver`] hands the fetcher a freshly created, writable file
//! for each resource. [`FolderDestination`] is the default: one folder per
//! site under a root directory, with collision-free file names.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use tokio::fs::{self, File, OpenOptions};
use tracing::debug;

use super::constants::MAX_NUMBERED_COLLISIONS;

/// A newly created file and the path it lives at.
#[derive(Debug)]
pub struct Destination {
    /// Path of the created file.
    pub path: PathBuf,
    /// Open handle, positioned at the start of an empty file.
    pub file: File,
}

/// Produces a writable file for a resource.
///
/// Implementations own the naming policy and must never return a handle to
/// an existing file.
#[async_trait]
pub trait DestinationResolver: Send + Sync {
    /// Creates the destination for `resource_title` inside the folder for `site_title`.
    async fn create(&self, resource_title: &str, site_title: &str) -> io::Result<Destination>;
}

/// Writes `<root>/<site title>/<resource title>`.
///
/// On a name collision the file is named `stem(1).ext` through `stem(9).ext`,
/// then gets a random prefix.
#[derive(Debug, Clone)]
pub struct FolderDestination {
    root: PathBuf,
}

impl FolderDestination {
    /// Creates a resolver rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DestinationResolver for FolderDestination {
    async fn create(&self, resource_title: &str, site_title: &str) -> io::Result<Destination> {
        let dir = self.root.join(sanitize_filename(site_title));
        fs::create_dir_all(&dir).await?;

        let filename = sanitize_filename(resource_title);
        for candidate in candidate_names(&filename) {
            let path = dir.join(&candidate);
            match create_new(&path).await {
                Ok(file) => {
                    debug!(path = %path.display(), "created destination");
                    return Ok(Destination { path, file });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }

        let prefix: u32 = rand::thread_rng().r#gen();
        let path = dir.join(format!("{prefix:08x}-{filename}"));
        let file = create_new(&path).await?;
        debug!(path = %path.display(), "created destination with random prefix");
        Ok(Destination { path, file })
    }
}

async fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

/// `name.ext`, then `name(1).ext` through `name(9).ext`.
fn candidate_names(filename: &str) -> Vec<String> {
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    };

    std::iter::once(filename.to_string())
        .chain((1..=MAX_NUMBERED_COLLISIONS).map(|i| format!("{stem}({i}){ext}")))
        .collect()
}

/// Sanitizes a single path component for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) and neutralizes `.`/`..`.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
