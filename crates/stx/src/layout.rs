// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Layouts and their per-name cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::asset::AssetRef;
use crate::error::{Result, StxError};
use crate::template::{Compiled, TemplateSystem};

/// A compiled layout.
#[derive(Debug)]
pub struct Layout<T> {
    /// Normalized layout name, e.g. `root.html`.
    pub name: String,
    /// The compiled layout template.
    pub compiled: Arc<Compiled<T>>,
}

impl<T> Layout<T> {
    /// Assets declared by the layout.
    pub fn assets(&self) -> &[AssetRef] {
        &self.compiled.assets
    }
}

/// Compiles each layout once per name.
#[derive(Debug)]
pub struct LayoutCache<T> {
    dir: String,
    layouts: Mutex<HashMap<String, Arc<Layout<T>>>>,
}

impl<T> LayoutCache<T> {
    /// Creates a cache reading layouts from `/{dir}/`.
    pub fn new(dir: &str) -> Self {
        Self {
            dir: dir.trim_matches('/').to_string(),
            layouts: Mutex::new(HashMap::new()),
        }
    }

    /// Logical path of a layout.
    pub fn path_of(&self, name: &str) -> String {
        format!("/{}/{}", self.dir, name)
    }

    /// Returns the layout named `name`, compiling it on first use.
    ///
    /// `page` is only used to report which page asked for a missing layout.
    pub fn get<S>(&self, templates: &S, name: &str, page: &str) -> Result<Arc<Layout<T>>>
    where
        S: TemplateSystem<Template = T>,
    {
        if let Some(layout) = self
            .layouts
            .lock()
            .map_err(|_| StxError::lock("layout cache"))?
            .get(name)
        {
            return Ok(layout.clone());
        }

        let path = self.path_of(name);
        let (compiled, _) = templates.compile(&path).map_err(|e| match e {
            StxError::FileNotFound(_) => StxError::LayoutNotFound {
                layout: name.to_string(),
                page: page.to_string(),
            },
            other => other,
        })?;

        debug!("Compiled layout {} ({} assets)", path, compiled.assets.len());
        let layout = Arc::new(Layout {
            name: name.to_string(),
            compiled,
        });
        self.layouts
            .lock()
            .map_err(|_| StxError::lock("layout cache"))?
            .insert(name.to_string(), layout.clone());
        Ok(layout)
    }

    /// Drops every cached layout.
    pub fn clear(&self) -> Result<()> {
        self.layouts
            .lock()
            .map_err(|_| StxError::lock("layout cache"))?
            .clear();
        Ok(())
    }
}
