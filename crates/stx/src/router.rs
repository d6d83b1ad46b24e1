// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! GET route table for compiled pages.

use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, StxError};

/// Escapes characters matchit treats as parameter syntax.
fn escape_pattern(path: &str) -> String {
    path.replace('{', "{{").replace('}', "}}")
}

/// Maps request paths to routes.
///
/// Every path is a static pattern: `/about/` and `/about` are different
/// routes. The first registration of a path wins.
pub struct PageTable<R> {
    /// matchit router for URL matching
    matcher: matchit::Router<usize>,

    /// Registered routes (indexed by matcher)
    routes: Vec<(String, Arc<R>)>,
}

impl<R> std::fmt::Debug for PageTable<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTable")
            .field("routes", &self.routes.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .finish()
    }
}

impl<R> Default for PageTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> PageTable<R> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
            routes: Vec::new(),
        }
    }

    /// Registers `route` for GET (and HEAD) requests to `path`.
    ///
    /// Returns false, and logs a warning, when the path is already taken.
    pub fn register_get(&mut self, path: &str, route: R) -> Result<bool> {
        if self.contains(path) {
            warn!("Route {} is already registered, skipping", path);
            return Ok(false);
        }
        self.matcher
            .insert(escape_pattern(path), self.routes.len())
            .map_err(|e| StxError::Route(format!("{}: {}", path, e)))?;
        self.routes.push((path.to_string(), Arc::new(route)));
        Ok(true)
    }

    /// Finds the route registered for `path`.
    pub fn match_path(&self, path: &str) -> Option<&Arc<R>> {
        let matched = self.matcher.at(path).ok()?;
        self.routes.get(*matched.value).map(|(_, route)| route)
    }

    /// True if `path` is registered.
    pub fn contains(&self, path: &str) -> bool {
        self.routes.iter().any(|(p, _)| p == path)
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &Arc<R>)> {
        self.routes.iter().map(|(path, route)| (path.as_str(), route))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
