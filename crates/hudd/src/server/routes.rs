//! HTTP handlers.

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use hud_protocol::{ControlResponse, PidResponse, StatusResponse};

use super::assets::{index_candidates, resolve_asset_path, serve_file};
use super::stream::{event_stream, SubscriberStream};
use super::AppState;
use crate::control::ControlError;
use crate::hub::HubError;

/// `GET /stream`: server-sent event stream.
pub async fn stream_handler(State(state): State<AppState>) -> Response {
    let subscription = match state.hub.attach().await {
        Ok(subscription) => subscription,
        Err(e) => return hub_unavailable(e),
    };
    debug!(subscriber = %subscription.id(), "Push client connected");

    let frames = SubscriberStream::new(subscription, state.hub.clone());
    let body = event_stream(frames, state.cancel_token.clone());

    Sse::new(body)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// `POST /api/pause`
pub async fn pause_handler(State(state): State<AppState>) -> Json<ControlResponse> {
    Json(control_response(state.control.pause().map(|_| ())))
}

/// `POST /api/resume`
pub async fn resume_handler(State(state): State<AppState>) -> Json<ControlResponse> {
    Json(control_response(state.control.resume().map(|_| ())))
}

/// `GET /api/pid`
pub async fn pid_handler(State(state): State<AppState>) -> Json<PidResponse> {
    Json(PidResponse {
        pid: state.control.current_pid().map(|pid| pid.get()),
    })
}

/// `GET /api/status`
pub async fn status_handler(State(state): State<AppState>) -> Response {
    match state.hub.stats().await {
        Ok(stats) => Json(StatusResponse {
            subscribers: stats.subscribers,
            buffered: stats.buffered,
            has_metrics: stats.has_metrics,
            published: stats.published,
            dropped: stats.dropped,
            pid: state.control.current_pid().map(|pid| pid.get()),
            started_at: state.started_at,
        })
        .into_response(),
        Err(e) => hub_unavailable(e),
    }
}

/// `GET /`: the dashboard page.
pub async fn index_handler(State(state): State<AppState>) -> Response {
    for candidate in index_candidates(&state.static_dir) {
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return serve_file(&candidate).await;
        }
    }
    StatusCode::NOT_FOUND.into_response()
}

/// `GET /static/*path`
pub async fn static_handler(
    State(state): State<AppState>,
    UrlPath(requested): UrlPath<String>,
) -> Response {
    match resolve_asset_path(&state.static_dir, &requested) {
        Some(path) => serve_file(&path).await,
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Adds the headers every relay response carries.
pub async fn relay_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static("no-cache"));
    response
}

fn control_response(result: Result<(), ControlError>) -> ControlResponse {
    match result {
        Ok(()) => ControlResponse::success(),
        Err(e) => ControlResponse::failure(e.to_string()),
    }
}

fn hub_unavailable(error: HubError) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ControlResponse::failure(error.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hud_core::WorkerPid;

    #[test]
    fn test_control_response_mapping() {
        assert_eq!(control_response(Ok(())), ControlResponse::success());

        let resp = control_response(Err(ControlError::PermissionDenied {
            pid: WorkerPid::new(3).unwrap(),
        }));
        assert!(!resp.ok);
        assert_eq!(
            resp.error.as_deref(),
            Some("permission denied signalling process 3")
        );
    }

    #[tokio::test]
    async fn test_relay_headers_keep_existing_cache_control() {
        let response = (
            [(header::CACHE_CONTROL, "no-store")],
            "body",
        )
            .into_response();
        let response = relay_headers(response).await;

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[test]
    fn test_hub_unavailable_status() {
        let response = hub_unavailable(HubError::ChannelClosed);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
