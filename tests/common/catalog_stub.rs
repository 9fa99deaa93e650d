//! Minimal catalog Web API stand-in for integration tests.
//!
//! Serves canned bodies keyed by path and query string and records the
//! `Authorization` header of every request. Unknown URLs answer 404.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};
use spotq::catalog::CatalogClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct StubState {
    pages: Arc<HashMap<String, (u16, String)>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

pub struct CatalogStub {
    pub base: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl CatalogStub {
    /// Bind a local server and serve the pages produced by `build`, which is
    /// given the API base URL so pages can carry absolute `next` links.
    /// Each page is `(path_and_query, status, body)`.
    pub async fn start<F>(build: F) -> Self
    where
        F: FnOnce(&str) -> Vec<(String, u16, String)>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let base = format!("http://{addr}/v1");

        let pages = build(&base)
            .into_iter()
            .map(|(path, status, body)| (path, (status, body)))
            .collect();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            pages: Arc::new(pages),
            hits: hits.clone(),
        };

        let app = Router::new().fallback(serve_page).with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("catalog stub");
        });

        Self { base, hits }
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn client(&self) -> CatalogClient {
        CatalogClient::with_api_base(reqwest::Client::new(), self.base.clone())
    }
}

async fn serve_page(State(state): State<StubState>, uri: Uri, headers: HeaderMap) -> Response {
    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.hits.lock().unwrap().push(Hit {
        path: key.clone(),
        authorization,
    });

    match state.pages.get(&key) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap(),
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn track(name: &str, artist: Option<&str>, url: &str) -> Value {
    let artists: Vec<Value> = artist.into_iter().map(|a| json!({ "name": a })).collect();
    json!({
        "name": name,
        "type": "track",
        "artists": artists,
        "external_urls": { "spotify": url },
    })
}

/// Album-style listing page.
pub fn page(items: Vec<Value>, next: Option<String>) -> String {
    json!({ "items": items, "next": next }).to_string()
}

/// Playlist-style listing page: every item wraps its track.
pub fn playlist_page(tracks: Vec<Value>, next: Option<String>) -> String {
    let items: Vec<Value> = tracks.into_iter().map(|t| json!({ "track": t })).collect();
    page(items, next)
}

/// Two-page album listing with three tracks, served under `/v1/albums/{id}`.
pub fn two_page_album(base: &str, id: &str) -> Vec<(String, u16, String)> {
    let second = format!("/v1/albums/{id}/tracks?offset=2&limit=50");
    vec![
        (
            format!("/v1/albums/{id}/tracks?limit=50"),
            200,
            page(
                vec![
                    track("One", Some("Ana"), "https://open.spotify.com/track/t1"),
                    track("Two", Some("Ben"), "https://open.spotify.com/track/t2"),
                ],
                Some(format!("{}{}", base.trim_end_matches("/v1"), second)),
            ),
        ),
        (
            second,
            200,
            page(
                vec![track("Three", None, "https://open.spotify.com/track/t3")],
                None,
            ),
        ),
    ]
}
