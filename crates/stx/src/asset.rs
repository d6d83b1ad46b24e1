// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Script and stylesheet assets declared by templates.
//!
//! An [`Asset`] is identified by its [`AssetId`], an opaque number assigned
//! at creation. Two assets with identical fields are still different assets
//! unless they come out of the same [`AssetStore`], which hands back the
//! existing asset for a repeated declaration.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StxError};

static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    fn next() -> Self {
        AssetId(NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    /// A script, served under `/js/`.
    Javascript,
    /// A stylesheet, served under `/css/`.
    Stylesheet,
}

impl AssetType {
    /// File extension and mount directory for this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            AssetType::Javascript => "js",
            AssetType::Stylesheet => "css",
        }
    }

    /// HTTP content type for this kind.
    pub fn content_type(&self) -> &'static str {
        match self {
            AssetType::Javascript => "application/javascript; charset=utf-8",
            AssetType::Stylesheet => "text/css; charset=utf-8",
        }
    }

    /// Parses `js` or `css`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" => Some(AssetType::Javascript),
            "css" => Some(AssetType::Stylesheet),
            _ => None,
        }
    }
}

/// Where an asset's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetBody {
    /// Raw bytes served by the asset server.
    Content(Vec<u8>),
    /// External reference emitted as-is in markup.
    Url(String),
}

/// A script or stylesheet.
#[derive(Debug, Clone)]
pub struct Asset {
    id: AssetId,
    name: String,
    kind: AssetType,
    origin: String,
    body: AssetBody,
    integrity: Option<String>,
    attributes: Vec<(String, String)>,
    priority: i32,
    dependencies: Vec<String>,
}

/// Shared handle to an asset.
pub type AssetRef = Arc<Asset>;

/// Returns the file stem of the last path segment of `origin`.
fn stem(origin: &str) -> String {
    let path = origin.split(['?', '#']).next().unwrap_or(origin);
    let file = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    let stem = match file.rfind('.') {
        Some(0) | None => file,
        Some(idx) => &file[..idx],
    };
    if stem.is_empty() {
        "asset".to_string()
    } else {
        stem.to_string()
    }
}

/// Hex encoded SHA-256 of `data`.
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

impl Asset {
    /// Creates an asset whose bytes are served by the asset server.
    ///
    /// `origin` is the logical path it was read from; its file stem becomes
    /// the declared name.
    pub fn from_content(kind: AssetType, origin: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let origin = origin.into();
        Self {
            id: AssetId::next(),
            name: stem(&origin),
            kind,
            origin,
            body: AssetBody::Content(content.into()),
            integrity: None,
            attributes: Vec::new(),
            priority: 0,
            dependencies: Vec::new(),
        }
    }

    /// Creates an asset referencing an external URL.
    pub fn from_url(kind: AssetType, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: AssetId::next(),
            name: stem(&url),
            kind,
            origin: url.clone(),
            body: AssetBody::Url(url),
            integrity: None,
            attributes: Vec::new(),
            priority: 0,
            dependencies: Vec::new(),
        }
    }

    /// Overrides the declared name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the subresource integrity hash.
    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }

    /// Appends an extra markup attribute. An empty value renders as a bare
    /// attribute (`defer`).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Sets the ordering priority; higher goes first among ready assets.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declares an asset, by origin or declared name, that must precede this one.
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// The asset's identity.
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// The declared name, before collision resolution.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The asset kind.
    pub fn kind(&self) -> AssetType {
        self.kind
    }

    /// Logical path or URL the asset was declared with.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Content or URL.
    pub fn body(&self) -> &AssetBody {
        &self.body
    }

    /// Raw bytes, if this is a content asset.
    pub fn content(&self) -> Option<&[u8]> {
        match &self.body {
            AssetBody::Content(bytes) => Some(bytes),
            AssetBody::Url(_) => None,
        }
    }

    /// External URL, if this is a url asset.
    pub fn url(&self) -> Option<&str> {
        match &self.body {
            AssetBody::Url(url) => Some(url),
            AssetBody::Content(_) => None,
        }
    }

    /// Integrity hash, if any.
    pub fn integrity(&self) -> Option<&str> {
        self.integrity.as_deref()
    }

    /// Extra markup attributes in declaration order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Ordering priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Declared dependencies.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// True if `reference` names this asset by origin or declared name.
    pub fn answers_to(&self, reference: &str) -> bool {
        self.origin == reference || self.name == reference
    }

    /// Key under which the store deduplicates declarations.
    fn declaration_key(&self) -> String {
        let body = match &self.body {
            AssetBody::Content(bytes) => format!("content:{}", sha256_hex(bytes)),
            AssetBody::Url(url) => format!("url:{}", url),
        };
        let attributes = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\u{1f}");
        format!(
            "{}\u{1e}{}\u{1e}{}\u{1e}{}\u{1e}{}\u{1e}{}\u{1e}{}\u{1e}{}",
            self.kind.extension(),
            self.origin,
            body,
            self.name,
            self.integrity.as_deref().unwrap_or(""),
            attributes,
            self.priority,
            self.dependencies.join("\u{1f}")
        )
    }
}

/// Interns asset declarations.
///
/// Compiling the same template twice yields the same [`AssetRef`]s, so
/// re-registering a page's assets does not mark the bundle dirty.
#[derive(Debug, Default)]
pub struct AssetStore {
    assets: Mutex<HashMap<String, AssetRef>>,
}

impl AssetStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored asset equal to `asset`, storing it first if new.
    pub fn intern(&self, asset: Asset) -> Result<AssetRef> {
        let key = asset.declaration_key();
        let mut assets = self.assets.lock().map_err(|_| StxError::lock("asset store"))?;
        Ok(assets
            .entry(key)
            .or_insert_with(|| Arc::new(asset))
            .clone())
    }

    /// Number of distinct declarations seen.
    pub fn len(&self) -> usize {
        self.assets.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// True if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_origin() {
        let asset = Asset::from_content(AssetType::Javascript, "/js/util.js", "x");
        assert_eq!(asset.name(), "util");

        let asset = Asset::from_url(AssetType::Stylesheet, "https://cdn.example.com/a/b/theme.min.css?v=3");
        assert_eq!(asset.name(), "theme.min");
        assert_eq!(asset.url(), Some("https://cdn.example.com/a/b/theme.min.css?v=3"));
        assert!(asset.content().is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Asset::from_content(AssetType::Javascript, "/app.js", "x");
        let b = Asset::from_content(AssetType::Javascript, "/app.js", "x");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_store_reuses_identical_declarations() {
        let store = AssetStore::new();
        let a = store
            .intern(Asset::from_content(AssetType::Javascript, "/app.js", "one").with_attribute("defer", ""))
            .unwrap();
        let b = store
            .intern(Asset::from_content(AssetType::Javascript, "/app.js", "one").with_attribute("defer", ""))
            .unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(store.len(), 1);

        // Changed content is a new asset
        let c = store
            .intern(Asset::from_content(AssetType::Javascript, "/app.js", "two").with_attribute("defer", ""))
            .unwrap();
        assert_ne!(a.id(), c.id());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_answers_to() {
        let asset = Asset::from_content(AssetType::Javascript, "/js/base.js", "");
        assert!(asset.answers_to("/js/base.js"));
        assert!(asset.answers_to("base"));
        assert!(!asset.answers_to("util"));
    }

    #[test]
    fn test_type_helpers() {
        assert_eq!(AssetType::from_extension("js"), Some(AssetType::Javascript));
        assert_eq!(AssetType::from_extension("css"), Some(AssetType::Stylesheet));
        assert_eq!(AssetType::from_extension("png"), None);
        assert!(AssetType::Stylesheet.content_type().starts_with("text/css"));
    }
}
