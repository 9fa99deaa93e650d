//! HTTP surface used by the browser plugin.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::manager::DownloadManager;
use crate::models::{DownloadRequest, QueueStatus};

#[derive(Debug, Serialize)]
struct Reply {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Reply {
    fn ok(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        let body = Self {
            success: true,
            message: Some(message.into()),
            error: None,
        };
        (StatusCode::OK, Json(body))
    }

    fn err(status: StatusCode, error: impl ToString) -> (StatusCode, Json<Self>) {
        let body = Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
        };
        (status, Json(body))
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(rename = "accessToken")]
    access_token: String,
}

pub fn router(manager: Arc<DownloadManager>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/set-token", post(set_token))
        .route("/download", post(download))
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .with_state(manager)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    manager: Arc<DownloadManager>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!("download server running on http://{addr}");
    info!("base download path: {}", manager.base_dir().display());

    axum::serve(listener, router(manager))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server closed");
    Ok(())
}

/// The plugin runs inside another origin, so every answer allows any origin and
/// preflight requests are answered directly.
async fn cors(req: Request, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    resp
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        message: "Server is running",
    })
}

async fn status(State(manager): State<Arc<DownloadManager>>) -> Json<QueueStatus> {
    Json(manager.status())
}

async fn set_token(State(manager): State<Arc<DownloadManager>>, body: Bytes) -> impl IntoResponse {
    match serde_json::from_slice::<TokenBody>(&body) {
        Ok(TokenBody { access_token }) => {
            manager.set_credential(access_token);
            Reply::ok("Access token set")
        }
        Err(e) => Reply::err(StatusCode::BAD_REQUEST, e),
    }
}

async fn download(State(manager): State<Arc<DownloadManager>>, body: Bytes) -> impl IntoResponse {
    let request = match serde_json::from_slice::<DownloadRequest>(&body) {
        Ok(request) => request,
        Err(e) => return Reply::err(StatusCode::BAD_REQUEST, e),
    };

    match manager.handle(request).await {
        Ok(message) => Reply::ok(message),
        Err(e) => {
            error!("download request failed: {e}");
            Reply::err(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
