// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page compilation and serving.
//!
//! A [`Site`] ties the VFS, a [`TemplateSystem`] and the [`Bundler`]
//! together:
//!
//! 1. [`Site::compile`] discovers page templates, compiles each one against
//!    its layout, registers the page's assets with the bundler and builds a
//!    new route table.
//! 2. [`Site::handle`] serves a request: assets below the asset mount, pages
//!    everywhere else.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stx::{DirSource, Site, SiteOptions, Vfs};
//!
//! let vfs = Arc::new(Vfs::new());
//! vfs.register(Arc::new(DirSource::new("./web")), "", 0)?;
//!
//! let site = Site::with_html_templates(vfs, SiteOptions::default(), Default::default());
//! let report = site.compile()?;
//! println!("{} pages", report.pages.len());
//!
//! let response = site.handle("/about/");
//! ```

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::asset::{Asset, AssetRef};
use crate::asset_server::{serve_asset, strip_mount};
use crate::bundler::{AssetOrder, Bundler, PageAssets, DEFAULT_ASSET_MOUNT};
use crate::error::{Result, StxError};
use crate::html_template::HtmlTemplateSystem;
use crate::layout::LayoutCache;
use crate::page::{compile_time_config, route_path, PageConfig, PageRoute};
use crate::response::SiteResponse;
use crate::router::PageTable;
use crate::template::TemplateSystem;
use crate::vfs::{Vfs, DEFAULT_LOOKUP_CACHE_SIZE};

fn default_extension() -> String {
    ".html".to_string()
}

fn default_layout_dir() -> String {
    "_layout".to_string()
}

fn default_layout() -> String {
    "root".to_string()
}

fn default_ignore_marker() -> String {
    "_".to_string()
}

fn default_asset_mount() -> String {
    DEFAULT_ASSET_MOUNT.to_string()
}

fn default_lookup_cache_size() -> usize {
    DEFAULT_LOOKUP_CACHE_SIZE
}

/// Site-wide conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteOptions {
    /// Extension of page and layout templates.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Directory holding layouts, relative to the logical root.
    #[serde(default = "default_layout_dir")]
    pub layout_dir: String,

    /// Layout used when a page names none.
    #[serde(default = "default_layout")]
    pub default_layout: String,

    /// Directories starting with this marker are not scanned for pages.
    #[serde(default = "default_ignore_marker")]
    pub ignore_marker: String,

    /// Path prefix the asset server is mounted at.
    #[serde(default = "default_asset_mount")]
    pub asset_mount: String,

    /// Whether layout or page assets come first.
    #[serde(default)]
    pub asset_order: AssetOrder,

    /// Capacity of the VFS lookup cache.
    #[serde(default = "default_lookup_cache_size")]
    pub lookup_cache_size: usize,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            layout_dir: default_layout_dir(),
            default_layout: default_layout(),
            ignore_marker: default_ignore_marker(),
            asset_mount: default_asset_mount(),
            asset_order: AssetOrder::default(),
            lookup_cache_size: default_lookup_cache_size(),
        }
    }
}

/// A page that failed to compile.
#[derive(Debug)]
pub struct CompileFailure {
    /// Logical path of the page template.
    pub path: String,
    /// Why it failed.
    pub error: StxError,
}

/// Outcome of a [`Site::compile`] pass.
#[derive(Debug, Default)]
pub struct CompileReport {
    /// Routes registered by this pass, in discovery order.
    pub pages: Vec<String>,
    /// Pages that were not registered.
    pub failures: Vec<CompileFailure>,
    /// Routes from the previous pass that no longer exist.
    pub removed: Vec<String>,
}

impl CompileReport {
    /// True if every discovered page compiled.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

type RouteTable<T> = PageTable<PageRoute<T>>;

/// A compiled site.
pub struct Site<S: TemplateSystem> {
    vfs: Arc<Vfs>,
    templates: S,
    bundler: Bundler,
    layouts: LayoutCache<S::Template>,
    routes: RwLock<Arc<RouteTable<S::Template>>>,
    options: SiteOptions,
}

impl<S: TemplateSystem> std::fmt::Debug for Site<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("options", &self.options)
            .field("bundler", &self.bundler)
            .finish_non_exhaustive()
    }
}

impl Site<HtmlTemplateSystem> {
    /// Creates a site using the built-in HTML template system.
    pub fn with_html_templates(vfs: Arc<Vfs>, options: SiteOptions, globals: Map<String, Value>) -> Self {
        let templates = HtmlTemplateSystem::new(vfs.clone()).with_globals(globals);
        Self::new(vfs, templates, options)
    }
}

impl<S: TemplateSystem> Site<S> {
    /// Creates a site. Nothing is compiled until [`Site::compile`].
    pub fn new(vfs: Arc<Vfs>, templates: S, options: SiteOptions) -> Self {
        Self {
            bundler: Bundler::with_options(options.asset_order, &options.asset_mount),
            layouts: LayoutCache::new(&options.layout_dir),
            routes: RwLock::new(Arc::new(PageTable::new())),
            vfs,
            templates,
            options,
        }
    }

    /// The VFS pages are read from.
    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    /// The template system.
    pub fn templates(&self) -> &S {
        &self.templates
    }

    /// The bundler.
    pub fn bundler(&self) -> &Bundler {
        &self.bundler
    }

    /// The site options.
    pub fn options(&self) -> &SiteOptions {
        &self.options
    }

    /// Adds an asset to every page.
    pub fn add_required_asset(&self, asset: Asset) -> Result<AssetRef> {
        let asset = Arc::new(asset);
        self.bundler.add_required_asset(asset.clone())?;
        Ok(asset)
    }

    /// The current route table.
    pub fn routes(&self) -> Result<Arc<RouteTable<S::Template>>> {
        Ok(self
            .routes
            .read()
            .map_err(|_| StxError::lock("site routes"))?
            .clone())
    }

    /// Discovers and compiles every page, then publishes the new route table.
    ///
    /// A page that fails to compile is logged and left out; it never aborts
    /// the pass.
    pub fn compile(&self) -> Result<CompileReport> {
        let pages = self
            .vfs
            .discover(&self.options.ignore_marker, &self.options.extension)?;
        debug!("Discovered {} page templates", pages.len());

        let mut table = PageTable::new();
        let mut report = CompileReport::default();

        for path in pages {
            match self.compile_page(&path) {
                Ok((route, assets)) => {
                    let route_path = route.route.clone();
                    if table.register_get(&route_path, route)? {
                        self.bundler.set_page_assets(&route_path, assets)?;
                        info!("Registered page {} -> {}", path, route_path);
                        report.pages.push(route_path);
                    }
                }
                Err(e) => {
                    error!("Failed to compile page {}: {}", path, e);
                    report.failures.push(CompileFailure { path, error: e });
                }
            }
        }

        let live: HashSet<&str> = report.pages.iter().map(String::as_str).collect();
        report.removed = self.bundler.retain_pages(|page| live.contains(page))?;

        *self
            .routes
            .write()
            .map_err(|_| StxError::lock("site routes"))? = Arc::new(table);

        Ok(report)
    }

    /// Drops cached layouts and VFS lookups, then compiles again.
    pub fn recompile(&self) -> Result<CompileReport> {
        self.vfs.clear_cache()?;
        self.layouts.clear()?;
        self.compile()
    }

    fn compile_page(&self, path: &str) -> Result<(PageRoute<S::Template>, PageAssets)> {
        let (page, context) = self.templates.compile(path)?;
        let config = compile_time_config(
            context.page,
            &self.options.default_layout,
            &self.options.extension,
        );
        let layout = self.layouts.get(&self.templates, &config.layout, path)?;
        let assets = PageAssets::new(page.assets.clone(), layout.assets().to_vec());

        let route = PageRoute {
            path: path.to_string(),
            route: route_path(path, &self.options.extension),
            page,
            layout,
            config,
        };
        Ok((route, assets))
    }

    /// Renders a page and its layout.
    pub fn render(&self, route: &PageRoute<S::Template>) -> Result<String> {
        let mut scope = self.templates.new_scope();
        let content = self.templates.execute(&route.page.template, &mut scope)?;

        // Only the title may change at runtime
        let page = match scope.take_page() {
            Some(runtime) => PageConfig {
                layout: route.config.layout.clone(),
                title: runtime.title,
            },
            None => route.config.clone(),
        };

        let mut layout_scope = self.templates.new_scope();
        layout_scope.set("page", &page)?;
        layout_scope.insert("content", Value::String(content));
        // Both tag lists come from the same bundle generation
        let bundle = self.bundler.snapshot()?;
        let mount = self.bundler.mount();
        layout_scope.insert("styles", Value::String(bundle.styles(&route.route, mount)));
        layout_scope.insert("scripts", Value::String(bundle.scripts(&route.route, mount)));
        layout_scope.set_page(page);

        self.templates
            .execute(&route.layout.compiled.template, &mut layout_scope)
    }

    /// Handles a GET request for `path`.
    pub fn handle(&self, path: &str) -> SiteResponse {
        if let Some(rest) = strip_mount(&self.options.asset_mount, path) {
            return serve_asset(&self.bundler, rest);
        }

        let routes = match self.routes() {
            Ok(routes) => routes,
            Err(e) => return SiteResponse::internal_error(e.to_string()),
        };

        let Some(route) = routes.match_path(path) else {
            let with_slash = format!("{}/", path);
            if !path.ends_with('/') && routes.contains(&with_slash) {
                return SiteResponse::redirect(with_slash);
            }
            return SiteResponse::not_found(format!("Page not found: {}", path));
        };

        match self.render(route) {
            Ok(body) => SiteResponse::html(200, body),
            Err(e) => {
                error!("Failed to render {}: {}", route.path, e);
                SiteResponse::internal_error(e.to_string())
            }
        }
    }
}
