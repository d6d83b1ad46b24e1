// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Integration tests for the HTTP adapter.
//!
//! These tests build a project on disk, compile it with the real CLI code and
//! drive the axum router through `axum-test`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use axum_test::TestServer;
use tempfile::tempdir;
use tokio::sync::broadcast;

use stx_cli::commands::{build_site, live_reload_asset};
use stx_cli::config::Config;
use stx_cli::server::http::{build_router, AppState};

/// Create a test project structure in a temp directory
fn setup_test_project(dir: &Path) {
    fs::create_dir_all(dir.join("web/_layout")).unwrap();
    fs::create_dir_all(dir.join("web/about")).unwrap();
    fs::create_dir_all(dir.join("web/css")).unwrap();
    fs::create_dir_all(dir.join("web/js")).unwrap();

    let root_layout = r#"<!DOCTYPE html>
<html>
<head><title>{page.title}</title>{@html styles}</head>
<body>{@html content}{@html scripts}</body>
</html>"#;
    fs::write(dir.join("web/_layout/root.html"), root_layout).unwrap();

    fs::write(
        dir.join("web/index.html"),
        r#"<page title="Home"/><link rel="stylesheet" href="/css/site.css"><h1>Home</h1>"#,
    )
    .unwrap();
    fs::write(
        dir.join("web/about/index.html"),
        r#"<page title="About"/><script src="/js/about.js"></script><h1>About</h1>"#,
    )
    .unwrap();
    fs::write(dir.join("web/css/site.css"), "body { margin: 0; }").unwrap();
    fs::write(dir.join("web/js/about.js"), "console.log('about');").unwrap();
}

fn test_server(dir: &Path, dev: bool) -> TestServer {
    let config = Config::load_from(dir).unwrap();
    let site = build_site(&config, dir).unwrap();
    if dev {
        site.add_required_asset(live_reload_asset(&site, &config.live_reload).unwrap())
            .unwrap();
    }
    let report = site.compile().unwrap();
    assert!(report.is_ok(), "{:?}", report.failures);

    let (reload_tx, _) = broadcast::channel(16);
    let state = Arc::new(AppState {
        site,
        reload_tx,
        live_reload: dev.then(|| config.live_reload.endpoint.clone()),
        dev,
    });
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn test_get_page() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());
    let server = test_server(dir.path(), false);

    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "text/html; charset=utf-8");

    let body = response.text();
    assert!(body.contains("<title>Home</title>"));
    assert!(body.contains(r#"<link rel="stylesheet" href="/assets/css/site.css">"#));
    assert!(!body.contains("livereload"));
    assert_eq!(
        response.header(header::CONTENT_LENGTH),
        body.len().to_string().as_str()
    );
    assert!(response.headers().get("server-timing").is_none());
}

#[tokio::test]
async fn test_head_has_headers_without_body() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());
    let server = test_server(dir.path(), false);

    let get = server.get("/about/").await;
    let head = server.method(Method::HEAD, "/about/").await;

    head.assert_status_ok();
    assert!(head.as_bytes().is_empty());
    assert_eq!(head.header(header::CONTENT_TYPE), get.header(header::CONTENT_TYPE));
    assert_eq!(
        head.header(header::CONTENT_LENGTH),
        get.text().len().to_string().as_str()
    );
}

#[tokio::test]
async fn test_assets() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());
    let server = test_server(dir.path(), false);

    let script = server.get("/assets/js/about.js").await;
    script.assert_status_ok();
    assert!(script
        .header(header::CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("application/javascript"));
    assert_eq!(script.text(), "console.log('about');");

    server.get("/assets/css/site.css").await.assert_status_ok();

    // Wrong type and unknown names
    server.get("/assets/js/site.js").await.assert_status_not_found();
    server.get("/assets/css/missing.css").await.assert_status_not_found();

    // Neither js nor css
    server
        .get("/assets/img/logo.png")
        .await
        .assert_status(StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_not_found_and_redirect() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());
    let server = test_server(dir.path(), false);

    server.get("/missing/").await.assert_status_not_found();

    // Layouts are never routes
    server.get("/_layout/root/").await.assert_status_not_found();

    let redirect = server.get("/about").await;
    redirect.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(redirect.header(header::LOCATION), "/about/");
}

#[tokio::test]
async fn test_percent_encoded_paths() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());
    fs::create_dir_all(dir.path().join("web/my notes")).unwrap();
    fs::write(dir.path().join("web/hello world.html"), "<h1>Hello</h1>").unwrap();
    fs::write(dir.path().join("web/café.html"), "<h1>Café</h1>").unwrap();
    fs::write(dir.path().join("web/my notes/index.html"), "<h1>Notes</h1>").unwrap();
    let server = test_server(dir.path(), false);

    let hello = server.get("/hello%20world.html").await;
    hello.assert_status_ok();
    assert!(hello.text().contains("<h1>Hello</h1>"));

    let cafe = server.get("/caf%C3%A9.html").await;
    cafe.assert_status_ok();
    assert!(cafe.text().contains("<h1>Café</h1>"));

    // The redirect target is encoded again
    let redirect = server.get("/my%20notes").await;
    redirect.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(redirect.header(header::LOCATION), "/my%20notes/");
    server.get("/my%20notes/").await.assert_status_ok();

    // Not valid UTF-8 once decoded
    server.get("/%FF.html").await.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_methods_rejected() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());
    let server = test_server(dir.path(), false);

    let response = server.post("/").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header(header::ALLOW), "GET, HEAD");
}

#[tokio::test]
async fn test_dev_mode() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());
    let server = test_server(dir.path(), true);

    let page = server.get("/about/").await;
    page.assert_status_ok();
    assert!(page
        .header("server-timing")
        .to_str()
        .unwrap()
        .starts_with("render;dur="));

    // The live reload client follows the page's own scripts
    let body = page.text();
    let about = body.find("/assets/js/about.js").unwrap();
    let client = body.find("/assets/js/livereload.js").unwrap();
    assert!(about < client);
    assert!(body.contains(r#"data-endpoint="/__livereload""#));

    let client = server.get("/assets/js/livereload.js").await;
    client.assert_status_ok();
    assert!(client.text().contains("WebSocket"));
}

#[tokio::test]
async fn test_recompile_picks_up_new_pages() {
    let dir = tempdir().unwrap();
    setup_test_project(dir.path());

    let config = Config::load_from(dir.path()).unwrap();
    let site = build_site(&config, dir.path()).unwrap();
    site.compile().unwrap();
    let server = TestServer::new(build_router(Arc::new(AppState::new(site.clone())))).unwrap();

    server.get("/contact/").await.assert_status_not_found();

    fs::create_dir_all(dir.path().join("web/contact")).unwrap();
    fs::write(
        dir.path().join("web/contact/index.html"),
        r#"<page title="Contact"/><h1>Contact</h1>"#,
    )
    .unwrap();
    fs::remove_dir_all(dir.path().join("web/about")).unwrap();

    let report = site.recompile().unwrap();
    assert_eq!(report.removed, vec!["/about/"]);

    server.get("/contact/").await.assert_status_ok();
    server.get("/about/").await.assert_status_not_found();
    server.get("/assets/js/about.js").await.assert_status_not_found();
}
