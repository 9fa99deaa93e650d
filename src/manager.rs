// src/manager.rs

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use futures_util::future::try_join_all;
use futures_util::FutureExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::executor::ExecutorError;
use crate::models::{Category, DownloadRequest, Job, QueueStatus};
use crate::queue::DownloadQueue;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("download of {name} failed: {source}")]
    Download {
        name: String,
        #[source]
        source: ExecutorError,
    },
    #[error("track {track} failed: {source}")]
    Track {
        track: String,
        #[source]
        source: ExecutorError,
    },
    #[error("could not create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns plugin requests into queued jobs, expanding albums, playlists and
/// artists into one job per track when a catalog credential is available.
pub struct DownloadManager {
    queue: DownloadQueue,
    catalog: CatalogClient,
    base_dir: PathBuf,
    credential: RwLock<Option<String>>,
}

impl DownloadManager {
    pub fn new(queue: DownloadQueue, catalog: CatalogClient, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue,
            catalog,
            base_dir: base_dir.into(),
            credential: RwLock::new(None),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Replace the catalog credential used for collection listings.
    pub fn set_credential(&self, token: impl Into<String>) {
        let mut slot = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
        info!("access token updated");
    }

    pub fn credential(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Handle one `POST /download` request, returning once every job it produced
    /// has finished.
    pub async fn handle(&self, request: DownloadRequest) -> Result<String, ManagerError> {
        if let Some(token) = request.access_token.as_deref().filter(|t| !t.is_empty()) {
            self.set_credential(token);
        }

        if !request.category.is_composite() {
            let job = Job::new(
                &request.url,
                &self.base_dir,
                request.category,
                &request.name,
            );
            self.run_single(job).await?;
            return Ok(format!("{} download completed", request.category));
        }

        let folder = self.base_dir.join(sanitize_filename(&request.name));
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|source| ManagerError::Io {
                path: folder.clone(),
                source,
            })?;

        match self.credential() {
            Some(token) => {
                self.download_collection(&request.url, &folder, request.category, &request.name, &token)
                    .await?;
            }
            None => {
                info!(name = %request.name, "no access token available, using standard download");
                let job = Job::new(&request.url, &folder, request.category, &request.name);
                self.run_single(job).await?;
            }
        }
        Ok(format!("{} download completed", request.category))
    }

    /// Expand a collection into one job per track and wait for all of them.
    ///
    /// With no resolvable tracks the collection itself is submitted as a single
    /// job. If any track fails the whole download fails, but tracks that already
    /// finished stay on disk and running siblings are left to complete.
    pub async fn download_collection(
        &self,
        reference: &str,
        folder: &Path,
        category: Category,
        name: &str,
        credential: &str,
    ) -> Result<usize, ManagerError> {
        info!(%category, name, "starting enhanced download");
        let tracks = self.catalog.fetch_tracks(reference, category, credential).await;

        if tracks.is_empty() {
            info!(name, "no tracks found, falling back to standard download");
            self.run_single(Job::new(reference, folder, category, name))
                .await?;
            return Ok(1);
        }

        info!(name, count = tracks.len(), "found tracks");
        let count = tracks.len();
        // Submitted in listing order before anything is awaited.
        let pending: Vec<_> = tracks
            .into_iter()
            .map(|track| {
                let track_name = track.display_name();
                let job = Job::new(track.url, folder, Category::Track, track_name.clone());
                self.queue.submit(job).map(move |res| {
                    res.map_err(|source| ManagerError::Track {
                        track: track_name,
                        source,
                    })
                })
            })
            .collect();
        match try_join_all(pending).await {
            Ok(_) => {
                info!(name, count, "all tracks completed");
                Ok(count)
            }
            Err(e) => {
                warn!(name, "some tracks failed: {e}");
                Err(e)
            }
        }
    }

    async fn run_single(&self, job: Job) -> Result<(), ManagerError> {
        let name = job.display_name.clone();
        self.queue
            .submit(job)
            .await
            .map(|_| ())
            .map_err(|source| ManagerError::Download { name, source })
    }
}

/// Make a display name safe to use as a folder name.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
