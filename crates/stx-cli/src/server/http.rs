// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP server for stx sites.
//!
//! This is a thin adapter that hands the request path to
//! [`Site::handle`] and converts the [`SiteResponse`] back to HTTP.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{State, WebSocketUpgrade},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use stx::{HtmlTemplateSystem, Site, SiteResponse};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

use super::livereload::{handle_websocket, ReloadEvent};

/// Shared application state.
pub struct AppState {
    /// The compiled site.
    pub site: Arc<Site<HtmlTemplateSystem>>,
    /// Channel for sending reload notifications.
    pub reload_tx: broadcast::Sender<ReloadEvent>,
    /// Live reload endpoint, when live reload is on.
    pub live_reload: Option<String>,
    /// Dev mode adds a `Server-Timing` header to pages.
    pub dev: bool,
}

impl AppState {
    /// State for `stx serve`: no live reload, no timing.
    pub fn new(site: Arc<Site<HtmlTemplateSystem>>) -> Self {
        let (reload_tx, _) = broadcast::channel(16);
        Self {
            site,
            reload_tx,
            live_reload: None,
            dev: false,
        }
    }
}

/// Builds the router for `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app: Router<Arc<AppState>> = Router::new();
    if let Some(endpoint) = &state.live_reload {
        app = app.route(
            endpoint,
            get(livereload_handler).layer(CorsLayer::permissive()),
        );
    }
    app.fallback(fallback_handler).with_state(state)
}

/// Creates and starts the HTTP server.
pub async fn create_server(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Serves pages and assets for GET and HEAD.
async fn fallback_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(header::ALLOW, "GET, HEAD")
            .body(Body::empty())
            .unwrap_or_else(|_| StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    // Routes are registered from decoded file names
    let path = match urlencoding::decode(uri.path()) {
        Ok(path) => path.into_owned(),
        Err(_) => {
            let response = SiteResponse::error(400, format!("Malformed path: {}", uri.path()));
            return to_http_response(response, method == Method::HEAD);
        }
    };
    let site = state.site.clone();
    let start = Instant::now();

    // Rendering reads templates and may rebuild the bundle
    let mut response = match tokio::task::spawn_blocking(move || site.handle(&path)).await {
        Ok(response) => response,
        Err(e) => {
            error!("Request handler panicked: {}", e);
            SiteResponse::internal_error("Internal server error")
        }
    };

    let elapsed = start.elapsed();
    debug!("{} {} -> {} in {:?}", method, uri.path(), response.status(), elapsed);

    if state.dev {
        response = response.with_header("server-timing", server_timing(elapsed));
    }
    to_http_response(response, method == Method::HEAD)
}

fn server_timing(elapsed: Duration) -> String {
    format!("render;dur={:.3}", elapsed.as_secs_f64() * 1000.0)
}

/// Percent-encodes each segment of a decoded path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Converts a [`SiteResponse`]. HEAD responses keep every header and drop
/// the body.
fn to_http_response(response: SiteResponse, head: bool) -> Response {
    let status = StatusCode::from_u16(response.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.body_bytes().to_vec();

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, response.content_type())
        .header(header::CONTENT_LENGTH, body.len());

    match &response {
        SiteResponse::Html { headers, .. } => {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        SiteResponse::Redirect { location, .. } => {
            builder = builder.header(header::LOCATION, encode_path(location));
        }
        SiteResponse::Asset { .. } | SiteResponse::Error { .. } => {}
    }

    let body = if head { Body::empty() } else { Body::from(body) };
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_keeps_headers() {
        let response = to_http_response(SiteResponse::html(200, "<p>hi</p>"), true);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "9");
        assert!(response.headers().get("server-timing").is_none());
    }

    #[test]
    fn test_redirect_location_is_encoded() {
        let response = to_http_response(SiteResponse::redirect("/about/"), false);
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/about/");

        let response = to_http_response(SiteResponse::redirect("/my notes/café/"), false);
        assert_eq!(response.headers()[header::LOCATION], "/my%20notes/caf%C3%A9/");
    }

    #[test]
    fn test_page_headers_are_written() {
        let page = SiteResponse::html(200, "x")
            .with_header("server-timing", server_timing(Duration::from_millis(3)));
        let response = to_http_response(page, false);
        assert_eq!(response.headers()["server-timing"], "render;dur=3.000");

        // Only pages carry extra headers
        let missing = SiteResponse::not_found("x").with_header("server-timing", "render;dur=1");
        let response = to_http_response(missing, false);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("server-timing").is_none());
    }
}
