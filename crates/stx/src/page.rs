// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page configuration and route derivation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::layout::Layout;
use crate::template::Compiled;
use crate::vfs::normalize_path;

/// Layout and title of a page.
///
/// The compile-time value selects the layout. The runtime value, produced
/// on every request, may only change the title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Layout file name, including the template extension.
    #[serde(default)]
    pub layout: String,
    /// Page title.
    #[serde(default)]
    pub title: String,
}

impl PageConfig {
    /// Creates a configuration.
    pub fn new(layout: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            title: title.into(),
        }
    }
}

/// Normalizes a layout name: trimmed, `default` when empty, and always
/// ending with `extension`.
pub fn layout_valid_name(name: &str, default: &str, extension: &str) -> String {
    let name = name.trim();
    let name = if name.is_empty() { default.trim() } else { name };
    if name.ends_with(extension) {
        name.to_string()
    } else {
        format!("{}{}", name, extension)
    }
}

/// Produces the compile-time configuration of a page.
///
/// A missing directive yields the default layout. A value that still holds
/// a placeholder (`{`) cannot be known at compile time: the layout falls
/// back to the default and the title to empty.
pub fn compile_time_config(config: Option<PageConfig>, default: &str, extension: &str) -> PageConfig {
    let mut config = config.unwrap_or_default();
    if config.layout.contains('{') {
        config.layout = String::new();
    }
    if config.title.contains('{') {
        config.title = String::new();
    }
    config.layout = layout_valid_name(&config.layout, default, extension);
    config
}

/// Derives the route of a page from its logical path.
///
/// `/about/index.html` becomes `/about/`; every other path is kept as is.
pub fn route_path(logical: &str, extension: &str) -> String {
    let path = normalize_path(logical);
    let index = format!("/index{}", extension);
    match path.strip_suffix(&index) {
        Some(parent) => format!("{}/", parent),
        None => path,
    }
}

/// A compiled page ready to be served.
#[derive(Debug)]
pub struct PageRoute<T> {
    /// Logical path of the page template.
    pub path: String,
    /// Route the page is served at.
    pub route: String,
    /// The compiled page.
    pub page: Arc<Compiled<T>>,
    /// The page's layout.
    pub layout: Arc<Layout<T>>,
    /// Compile-time configuration.
    pub config: PageConfig,
}
