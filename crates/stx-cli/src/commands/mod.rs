// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `init`: Scaffold a new stx project
//! - `dev`: Serve with live reload and file watching
//! - `serve`: Serve without live reload
//! - `routes`: Print every route with its bundles

/// Development server command.
pub mod dev;
/// Project initialization command.
pub mod init;
/// Route listing command.
pub mod routes;
/// Server command.
pub mod serve;

use console::style;
use include_dir::{include_dir, Dir};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stx::{
    Asset, AssetType, CompileReport, DirSource, EmbeddedSource, HtmlTemplateSystem, Site, Vfs,
};

use crate::config::{Config, LiveReloadConfig};

/// Files compiled into the binary, mounted below every project source.
static DEFAULT_FILES: Dir = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Priority of the embedded default files.
pub const DEFAULT_FILES_PRIORITY: i32 = -1;

/// Logical path of the live reload client.
pub const LIVE_RELOAD_CLIENT: &str = "/_stx/livereload.js";

/// Builds an uncompiled site from `config`, resolving sources against `base`.
pub fn build_site(config: &Config, base: &Path) -> anyhow::Result<Arc<Site<HtmlTemplateSystem>>> {
    let vfs = Arc::new(Vfs::with_cache_size(config.site.lookup_cache_size));

    for source in &config.sources {
        let dir = base.join(&source.dir);
        if !dir.is_dir() {
            tracing::warn!("Source directory {} does not exist", dir.display());
        }
        vfs.register(Arc::new(DirSource::new(dir)), &source.root, source.priority)?;
    }
    vfs.register(
        Arc::new(EmbeddedSource::new(&DEFAULT_FILES)),
        "",
        DEFAULT_FILES_PRIORITY,
    )?;

    Ok(Arc::new(Site::with_html_templates(
        vfs,
        config.site.clone(),
        config.globals.clone(),
    )))
}

/// Creates the live reload client asset, configured through data attributes.
pub fn live_reload_asset(
    site: &Site<HtmlTemplateSystem>,
    config: &LiveReloadConfig,
) -> anyhow::Result<Asset> {
    let content = site.vfs().resolve(LIVE_RELOAD_CLIENT)?;
    Ok(Asset::from_content(AssetType::Javascript, LIVE_RELOAD_CLIENT, content)
        .with_attribute("data-endpoint", config.endpoint.as_str())
        .with_attribute("data-interval", config.interval.to_string())
        .with_attribute("data-reload-page-on-css", config.reload_css.to_string()))
}

/// `host:port`, with command-line values taking precedence over `stx.toml`.
pub fn server_addr(config: &Config, host: Option<String>, port: Option<u16>) -> String {
    format!(
        "{}:{}",
        host.unwrap_or_else(|| config.server.host.clone()),
        port.unwrap_or(config.server.port)
    )
}

/// Prints the outcome of a compile pass.
pub fn print_report(report: &CompileReport, elapsed: Duration) {
    println!(
        "  {} {} {}",
        style("✓").green(),
        style(format!("{} page(s) compiled", report.pages.len())).dim(),
        style(format!("{}ms", elapsed.as_millis())).dim()
    );
    for page in &report.removed {
        println!("  {} {}", style("-").yellow(), style(page).dim());
    }
    print_failures(report);
}

/// Prints compile failures. Failed pages are not served.
pub fn print_failures(report: &CompileReport) {
    if report.is_ok() {
        return;
    }
    eprintln!();
    eprintln!(
        "{}",
        style(format!("{} page(s) failed to compile:", report.failures.len()))
            .red()
            .bold()
    );
    for failure in &report.failures {
        eprintln!(
            "  {} {} {}",
            style("✗").red(),
            style(&failure.path).red(),
            style(&failure.error).dim()
        );
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_build_site_mounts_defaults() {
        let dir = tempdir().unwrap();
        let site = build_site(&Config::default(), dir.path()).unwrap();

        let mounts = site.vfs().mounts().unwrap();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].source().kind(), "dir");
        assert_eq!(mounts[1].priority(), DEFAULT_FILES_PRIORITY);
        assert!(site.vfs().exists(LIVE_RELOAD_CLIENT));
    }

    #[test]
    fn test_live_reload_asset_is_required() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("web/_layout")).unwrap();
        fs::write(
            dir.path().join("web/_layout/root.html"),
            "<html><head>{@html styles}</head><body>{@html content}{@html scripts}</body></html>",
        )
        .unwrap();
        fs::write(dir.path().join("web/index.html"), "<h1>Home</h1>").unwrap();

        let config = Config::default();
        let site = build_site(&config, dir.path()).unwrap();
        site.add_required_asset(live_reload_asset(&site, &config.live_reload).unwrap())
            .unwrap();
        let report = site.compile().unwrap();
        assert_eq!(report.pages, vec!["/"]);

        let body = String::from_utf8(site.handle("/").body_bytes().to_vec()).unwrap();
        assert!(body.contains(r#"src="/assets/js/livereload.js""#));
        assert!(body.contains(r#"data-endpoint="/__livereload""#));
        assert!(body.contains(r#"data-interval="100""#));
        assert!(body.contains(r#"data-reload-page-on-css="false""#));

        // The client lives under an ignored directory and is never a page
        assert_eq!(site.handle("/_stx/livereload").status(), 404);
        assert_eq!(site.handle("/assets/js/livereload.js").status(), 200);
    }

    #[test]
    fn test_rooted_source_serves_subdirectory() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("web/_layout")).unwrap();
        fs::create_dir_all(dir.path().join("theme/site/guide")).unwrap();
        fs::write(dir.path().join("web/_layout/root.html"), "<main>{@html content}</main>").unwrap();
        fs::write(dir.path().join("theme/site/x.html"), "<p>x</p>").unwrap();
        fs::write(dir.path().join("theme/site/guide/index.html"), "<p>guide</p>").unwrap();
        // Outside the root, never visible
        fs::write(dir.path().join("theme/hidden.html"), "<p>hidden</p>").unwrap();
        fs::write(
            dir.path().join("stx.toml"),
            "[[sources]]\ndir = \"web\"\n\n[[sources]]\ndir = \"theme\"\nroot = \"/site\"\npriority = -5\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        let site = build_site(&config, dir.path()).unwrap();
        let report = site.compile().unwrap();

        let mut pages = report.pages.clone();
        pages.sort();
        assert_eq!(pages, vec!["/guide/", "/x.html"]);

        let body = String::from_utf8(site.handle("/x.html").body_bytes().to_vec()).unwrap();
        assert_eq!(body, "<main><p>x</p></main>");
        assert_eq!(site.handle("/guide/").status(), 200);
        assert_eq!(site.handle("/hidden.html").status(), 404);
        assert_eq!(site.handle("/site/x.html").status(), 404);
    }

    #[test]
    fn test_live_reload_client_honours_css_setting() {
        let client = DEFAULT_FILES
            .get_file(LIVE_RELOAD_CLIENT.trim_start_matches('/'))
            .and_then(|f| f.contents_utf8())
            .unwrap();

        // Stylesheets are swapped only when full reloads are not requested
        assert!(client.contains(r#"event.data === "css" && !reloadPageOnCss"#));
        assert!(client.contains(r#"data.reloadPageOnCss === "true""#));
    }

    #[test]
    fn test_server_addr() {
        let config = Config::default();
        assert_eq!(server_addr(&config, None, None), "127.0.0.1:3000");
        assert_eq!(
            server_addr(&config, Some("0.0.0.0".to_string()), Some(8080)),
            "0.0.0.0:8080"
        );
    }
}
