//! Track-list resolution against the music catalog Web API.
//!
//! Albums and playlists are listed page by page following the `next` pointer
//! each response carries; artists resolve to their top tracks in one request.
//! Resolution is best effort: any failing page ends it and whatever was fetched
//! so far is returned.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Category, TrackDescriptor};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_MARKET: &str = "US";

/// Page size requested from album and playlist listings.
const PAGE_LIMIT: usize = 50;

/// Upper bound on followed `next` pointers, guards against cyclic listings.
const MAX_PAGES: usize = 1_000;

/// Artist name used when a track lists no artists.
const UNKNOWN_ARTIST: &str = "Unknown";

/// Why a listing page could not be used. Never leaves this module.
#[derive(Debug, Error)]
enum CatalogError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog answered {0}")]
    Status(StatusCode),
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    #[serde(default)]
    track: Option<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    #[serde(default)]
    tracks: Vec<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
struct CatalogTrack {
    name: String,
    #[serde(default)]
    artists: Vec<CatalogArtist>,
    #[serde(default)]
    external_urls: ExternalUrls,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogArtist {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl CatalogTrack {
    fn into_descriptor(self) -> Option<TrackDescriptor> {
        let url = self.external_urls.spotify?;
        let artist = self
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        Some(TrackDescriptor {
            title: self.name,
            artist,
            url,
        })
    }
}

/// Resolves collections into their individual tracks.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    api_base: String,
    market: String,
}

impl CatalogClient {
    pub fn new(http: Client) -> Self {
        Self::with_api_base(http, DEFAULT_API_BASE)
    }

    pub fn with_api_base(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            market: DEFAULT_MARKET.to_string(),
        }
    }

    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    /// URL of the first listing page for `id`, or `None` for single tracks.
    pub fn listing_url(&self, category: Category, id: &str) -> Option<String> {
        let base = &self.api_base;
        match category {
            Category::Album => Some(format!("{base}/albums/{id}/tracks?limit={PAGE_LIMIT}")),
            Category::Playlist => Some(format!("{base}/playlists/{id}/tracks?limit={PAGE_LIMIT}")),
            Category::Artist => Some(format!(
                "{base}/artists/{id}/top-tracks?market={}",
                self.market
            )),
            Category::Track => None,
        }
    }

    /// List every track of the collection behind `reference`, in catalog order.
    ///
    /// Never fails: a rejected or broken page truncates the result to the pages
    /// already fetched, and an empty result is valid.
    pub async fn fetch_tracks(
        &self,
        reference: &str,
        category: Category,
        credential: &str,
    ) -> Vec<TrackDescriptor> {
        let id = collection_id(reference);
        let Some(first) = self.listing_url(category, id) else {
            return Vec::new();
        };

        let mut tracks = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages >= MAX_PAGES {
                warn!(reference, "stopping after {MAX_PAGES} listing pages");
                break;
            }
            pages += 1;

            match self.fetch_page(&url, category, credential).await {
                Ok((batch, following)) => {
                    debug!(page = pages, count = batch.len(), "fetched listing page");
                    tracks.extend(batch);
                    // Artist top tracks are a single response.
                    if category != Category::Artist {
                        next = following;
                    }
                }
                Err(e) => {
                    warn!(
                        reference,
                        page = pages,
                        kept = tracks.len(),
                        "track listing stopped early: {e}"
                    );
                    break;
                }
            }
        }

        tracks
    }

    async fn fetch_page(
        &self,
        url: &str,
        category: Category,
        credential: &str,
    ) -> Result<(Vec<TrackDescriptor>, Option<String>), CatalogError> {
        let resp = self.http.get(url).bearer_auth(credential).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }

        let page = match category {
            Category::Album => {
                let page: Page<CatalogTrack> = resp.json().await?;
                let tracks = page
                    .items
                    .into_iter()
                    .filter_map(CatalogTrack::into_descriptor)
                    .collect();
                (tracks, page.next)
            }
            Category::Playlist => {
                let page: Page<PlaylistEntry> = resp.json().await?;
                let tracks = page
                    .items
                    .into_iter()
                    .filter_map(|entry| entry.track)
                    .filter(|t| t.kind.as_deref() == Some("track"))
                    .filter_map(CatalogTrack::into_descriptor)
                    .collect();
                (tracks, page.next)
            }
            Category::Artist => {
                let top: TopTracks = resp.json().await?;
                let tracks = top
                    .tracks
                    .into_iter()
                    .filter_map(CatalogTrack::into_descriptor)
                    .collect();
                (tracks, None)
            }
            Category::Track => (Vec::new(), None),
        };
        Ok(page)
    }
}

/// Extract the catalog id from a share URL (`https://open.spotify.com/album/<id>?si=..`)
/// or a URI (`spotify:album:<id>`).
pub fn collection_id(reference: &str) -> &str {
    let reference = reference.trim();
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let path = path.trim_end_matches('/');
    let tail = path.rsplit('/').next().unwrap_or(path);
    tail.rsplit(':').next().unwrap_or(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_share_url() {
        assert_eq!(
            collection_id("https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy?si=abc"),
            "4aawyAB9vmqN3uQ7FjRGTy"
        );
        assert_eq!(
            collection_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M/"),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
    }

    #[test]
    fn id_from_uri() {
        assert_eq!(collection_id("spotify:artist:0OdUWJ0sBjDrqHygGUXeCF"), "0OdUWJ0sBjDrqHygGUXeCF");
    }

    #[test]
    fn listing_urls_per_category() {
        let client = CatalogClient::with_api_base(Client::new(), "http://catalog.test/v1/");
        assert_eq!(
            client.listing_url(Category::Album, "a1").as_deref(),
            Some("http://catalog.test/v1/albums/a1/tracks?limit=50")
        );
        assert_eq!(
            client.listing_url(Category::Playlist, "p1").as_deref(),
            Some("http://catalog.test/v1/playlists/p1/tracks?limit=50")
        );
        assert_eq!(
            client.with_market("SE").listing_url(Category::Artist, "x").as_deref(),
            Some("http://catalog.test/v1/artists/x/top-tracks?market=SE")
        );
    }

    #[test]
    fn tracks_have_no_listing() {
        let client = CatalogClient::new(Client::new());
        assert!(client.listing_url(Category::Track, "t").is_none());
    }

    #[test]
    fn missing_artist_defaults_to_unknown() {
        let track: CatalogTrack = serde_json::from_str(
            r#"{"name":"Solo","artists":[],"external_urls":{"spotify":"https://t/1"}}"#,
        )
        .unwrap();
        let d = track.into_descriptor().unwrap();
        assert_eq!(d.artist, "Unknown");
        assert_eq!(d.display_name(), "Solo - Unknown");
    }

    #[test]
    fn track_without_url_is_skipped() {
        let track: CatalogTrack =
            serde_json::from_str(r#"{"name":"Local file","external_urls":{}}"#).unwrap();
        assert!(track.into_descriptor().is_none());
    }
}
