// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What kind of catalog entity a request points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Track,
    Album,
    Playlist,
    Artist,
}

impl Category {
    /// Albums, playlists and artists expand into several track jobs.
    pub fn is_composite(self) -> bool {
        !matches!(self, Category::Track)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Track => "track",
            Category::Album => "album",
            Category::Playlist => "playlist",
            Category::Artist => "artist",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of executor work: a single invocation of the external downloader.
///
/// Jobs carry no identity beyond their queue position, identical jobs are not
/// deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source_reference: String,
    pub destination: PathBuf,
    pub category: Category,
    pub display_name: String,
}

impl Job {
    pub fn new(
        source_reference: impl Into<String>,
        destination: impl Into<PathBuf>,
        category: Category,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            source_reference: source_reference.into(),
            destination: destination.into(),
            category,
            display_name: display_name.into(),
        }
    }
}

/// A single track resolved out of an album, playlist or artist listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub title: String,
    /// Primary artist, "Unknown" when the catalog lists none.
    pub artist: String,
    pub url: String,
}

impl TrackDescriptor {
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

/// Body of `POST /download` as sent by the plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub name: String,
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Read-only snapshot of the scheduler, served on `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub active_downloads: usize,
    pub max_concurrent: usize,
    pub queue_length: usize,
    pub queued_items: Vec<String>,
}
