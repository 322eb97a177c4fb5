//! Read-only static assets: the dashboard page and its images.

use std::path::{Component, Path, PathBuf};

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Dashboard page served at `/`.
pub const INDEX_FILE: &str = "live_status.html";

/// Maps a request path to a file under `root`.
///
/// Returns `None` for empty paths and for anything that could leave `root`
/// (`..`, absolute paths, prefixes).
pub fn resolve_asset_path(root: &Path, requested: &str) -> Option<PathBuf> {
    let relative = Path::new(requested);
    let mut components = relative.components().peekable();
    components.peek()?;

    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(root.join(relative))
    } else {
        None
    }
}

/// Content type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Reads a file and wraps it in a response, 404 if it cannot be read.
pub async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(path))], bytes).into_response(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Asset not served");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Candidate locations of the dashboard page, in lookup order.
pub fn index_candidates(static_dir: &Path) -> [PathBuf; 2] {
    [static_dir.join(INDEX_FILE), PathBuf::from(INDEX_FILE)]
}
