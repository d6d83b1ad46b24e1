// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # stx
//!
//! Layered content sources, asset bundling and page serving for
//! template-driven sites.
//!
//! stx discovers page templates across overlapping content sources,
//! compiles each page against a named layout, collects the scripts and
//! stylesheets the templates declare into per-page bundles, and serves the
//! rendered pages and the bundled assets.
//!
//! ## Features
//!
//! - Layered virtual file system with priorities and lookup caching
//! - Collision-free asset naming across the whole site
//! - Dependency-ordered script and stylesheet bundles per page
//! - Compile-time layout selection, runtime titles
//! - Pluggable template systems, with a small HTML one built in
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stx::{DirSource, Site, SiteOptions, Vfs};
//!
//! let vfs = Arc::new(Vfs::new());
//! vfs.register(Arc::new(DirSource::new("./web")), "", 0)?;
//!
//! let site = Site::with_html_templates(vfs, SiteOptions::default(), Default::default());
//! site.compile()?;
//!
//! let response = site.handle("/");
//! ```

/// Error types.
pub mod error;
/// Byte sources (directories, memory, embedded).
pub mod source;
/// Layered virtual file system.
pub mod vfs;
/// Script and stylesheet assets.
pub mod asset;
/// Dependency ordering of assets.
pub mod dependencies;
/// Per-page asset bundles.
pub mod bundler;
/// Template system seam.
pub mod template;
/// Built-in HTML template system.
pub mod html_template;
/// Page configuration and routes.
pub mod page;
/// Layouts.
pub mod layout;
/// Page route table.
pub mod router;
/// Transport independent responses.
pub mod response;
/// Asset serving.
pub mod asset_server;
/// Page compilation and serving.
pub mod site;

pub use asset::{Asset, AssetBody, AssetId, AssetRef, AssetStore, AssetType};
pub use asset_server::{parse_asset_path, serve_asset, AssetRequest};
pub use bundler::{AssetOrder, Bundle, BundledAsset, Bundler, CycleReport, PageAssets};
pub use error::*;
pub use html_template::{HtmlTemplate, HtmlTemplateSystem};
pub use layout::{Layout, LayoutCache};
pub use page::{layout_valid_name, route_path, PageConfig, PageRoute};
pub use response::SiteResponse;
pub use router::PageTable;
pub use site::{CompileFailure, CompileReport, Site, SiteOptions};
pub use source::{DirSource, EmbeddedSource, MemorySource, Source, SourceEntry};
pub use template::{escape_html, CompileContext, Compiled, Scope, TemplateSystem};
pub use vfs::{normalize_path, Mount, Vfs};
