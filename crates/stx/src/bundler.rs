// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Per-page asset bundles.
//!
//! The [`Bundler`] records which assets every page declared, plus a set of
//! required assets injected into every page. From those inputs it builds a
//! [`Bundle`]: one collision-free name per asset across the whole site, and
//! an ordered script list and stylesheet list per page.
//!
//! # Rebuilds
//!
//! Mutations only mark the bundler dirty. The next read rebuilds a complete
//! new [`Bundle`] and swaps it in under the same lock that guards the dirty
//! flag, so a reader sees either the previous bundle or the next one.
//!
//! # Ordering
//!
//! For each page and asset type the list starts from the layout's assets
//! followed by the page's own (or the reverse, see [`AssetOrder`]), then the
//! required assets. The list is then topologically sorted on declared
//! dependencies, keeping the higher priority first among ready assets.
//! Assets blocked by a dependency cycle are dropped from that list and
//! recorded as a [`CycleReport`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::asset::{sha256_hex, AssetId, AssetRef, AssetType};
use crate::dependencies::order_assets;
use crate::error::{Result, StxError};
use crate::template::escape_html;

/// Default mount point of the asset server.
pub const DEFAULT_ASSET_MOUNT: &str = "/assets";

/// Page label used in cycle reports for the required-only bundle.
pub const REQUIRED_BUNDLE: &str = "<required>";

/// Which declarations come first in a page bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetOrder {
    /// Layout assets, then page assets.
    #[default]
    LayoutFirst,
    /// Page assets, then layout assets.
    PageFirst,
}

/// Assets declared for one page, split by declarer.
#[derive(Debug, Clone, Default)]
pub struct PageAssets {
    /// Declared by the page template.
    pub page: Vec<AssetRef>,
    /// Declared by the page's layout.
    pub layout: Vec<AssetRef>,
}

impl PageAssets {
    /// Creates the set from page and layout declarations.
    pub fn new(page: Vec<AssetRef>, layout: Vec<AssetRef>) -> Self {
        Self { page, layout }
    }

    fn ordered(&self, order: AssetOrder) -> impl Iterator<Item = &AssetRef> {
        let (first, second) = match order {
            AssetOrder::LayoutFirst => (&self.layout, &self.page),
            AssetOrder::PageFirst => (&self.page, &self.layout),
        };
        first.iter().chain(second.iter())
    }
}

impl From<Vec<AssetRef>> for PageAssets {
    fn from(page: Vec<AssetRef>) -> Self {
        Self { page, layout: Vec::new() }
    }
}

fn same_members(a: &[AssetRef], b: &[AssetRef]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let ids: HashSet<AssetId> = a.iter().map(|asset| asset.id()).collect();
    b.iter().all(|asset| ids.contains(&asset.id()))
}

/// A dependency cycle found while ordering one page list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Route of the affected page.
    pub page: String,
    /// The affected list.
    pub kind: AssetType,
    /// Origins of the assets dropped from the list.
    pub blocked: Vec<String>,
}

/// An asset with the name it is served under.
#[derive(Debug, Clone)]
pub struct BundledAsset {
    /// Collision-free name.
    pub name: String,
    /// The asset.
    pub asset: AssetRef,
}

impl BundledAsset {
    /// URL the asset is reachable at: its external URL, or the asset server path.
    pub fn href(&self, mount: &str) -> String {
        match self.asset.url() {
            Some(url) => url.to_string(),
            None => format!(
                "{}/{}/{}.{}",
                mount.trim_end_matches('/'),
                self.asset.kind().extension(),
                self.name,
                self.asset.kind().extension()
            ),
        }
    }

    fn push_common_attributes(&self, out: &mut String) {
        if let Some(integrity) = self.asset.integrity() {
            out.push_str(&format!(" integrity=\"{}\"", escape_html(integrity)));
        }
        for (name, value) in self.asset.attributes() {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str(&format!("=\"{}\"", escape_html(value)));
            }
        }
    }

    /// Renders a `<script>` tag.
    pub fn script_tag(&self, mount: &str) -> String {
        let mut out = format!(
            "<script type=\"application/javascript\" src=\"{}\"",
            escape_html(&self.href(mount))
        );
        self.push_common_attributes(&mut out);
        out.push_str("></script>");
        out
    }

    /// Renders a stylesheet `<link>` tag.
    pub fn link_tag(&self, mount: &str) -> String {
        let mut out = format!("<link rel=\"stylesheet\" href=\"{}\"", escape_html(&self.href(mount)));
        self.push_common_attributes(&mut out);
        out.push('>');
        out
    }
}

#[derive(Debug, Clone, Default)]
struct PageBundle {
    scripts: Vec<AssetRef>,
    styles: Vec<AssetRef>,
}

impl PageBundle {
    fn list(&self, kind: AssetType) -> &[AssetRef] {
        match kind {
            AssetType::Javascript => &self.scripts,
            AssetType::Stylesheet => &self.styles,
        }
    }
}

/// An immutable, fully resolved bundle.
#[derive(Debug, Default)]
pub struct Bundle {
    generation: u64,
    names: HashMap<AssetId, String>,
    index: HashMap<String, AssetRef>,
    pages: HashMap<String, PageBundle>,
    required: PageBundle,
    cycles: Vec<CycleReport>,
}

impl Bundle {
    /// Number of rebuilds that produced this bundle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolved name of an asset.
    pub fn name_of(&self, id: AssetId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Global lookup by resolved name.
    pub fn asset(&self, name: &str) -> Option<&AssetRef> {
        self.index.get(name)
    }

    /// Ordered assets of one type for a page. Unknown pages get the
    /// required assets only.
    pub fn assets(&self, page: &str, kind: AssetType) -> Vec<BundledAsset> {
        let bundle = self.pages.get(page).unwrap_or(&self.required);
        bundle
            .list(kind)
            .iter()
            .filter_map(|asset| {
                self.name_of(asset.id()).map(|name| BundledAsset {
                    name: name.to_string(),
                    asset: asset.clone(),
                })
            })
            .collect()
    }

    /// Script tags for a page, one per line.
    pub fn scripts(&self, page: &str, mount: &str) -> String {
        self.assets(page, AssetType::Javascript)
            .iter()
            .map(|asset| asset.script_tag(mount))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Stylesheet link tags for a page, one per line.
    pub fn styles(&self, page: &str, mount: &str) -> String {
        self.assets(page, AssetType::Stylesheet)
            .iter()
            .map(|asset| asset.link_tag(mount))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cycles found during the rebuild.
    pub fn cycles(&self) -> &[CycleReport] {
        &self.cycles
    }
}

#[derive(Debug, Default)]
struct BundlerState {
    order: Vec<String>,
    pages: HashMap<String, PageAssets>,
    required: Vec<AssetRef>,
    dirty: bool,
    bundle: Arc<Bundle>,
}

/// Owns page asset membership and the published [`Bundle`].
#[derive(Debug)]
pub struct Bundler {
    state: Mutex<BundlerState>,
    asset_order: AssetOrder,
    mount: String,
}

impl Default for Bundler {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundler {
    /// Creates a bundler with layout-first ordering mounted at `/assets`.
    pub fn new() -> Self {
        Self::with_options(AssetOrder::default(), DEFAULT_ASSET_MOUNT)
    }

    /// Creates a bundler with explicit ordering and asset mount point.
    pub fn with_options(asset_order: AssetOrder, mount: &str) -> Self {
        let mount = format!("/{}", mount.trim_matches('/'));
        Self {
            state: Mutex::new(BundlerState::default()),
            asset_order,
            mount,
        }
    }

    /// Mount point used in generated URLs.
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// The configured tie-break.
    pub fn asset_order(&self) -> AssetOrder {
        self.asset_order
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BundlerState>> {
        self.state.lock().map_err(|_| StxError::lock("bundler"))
    }

    /// Replaces the assets declared for a page.
    ///
    /// Returns true if the bundle was marked dirty, which only happens when
    /// the page is new or a list changed in length or membership.
    pub fn set_page_assets(&self, page: &str, assets: impl Into<PageAssets>) -> Result<bool> {
        let assets = assets.into();
        let mut state = self.lock()?;

        let changed = match state.pages.get(page) {
            Some(previous) => {
                !same_members(&previous.page, &assets.page)
                    || !same_members(&previous.layout, &assets.layout)
            }
            None => true,
        };
        if !state.pages.contains_key(page) {
            state.order.push(page.to_string());
        }

        state.pages.insert(page.to_string(), assets);
        if changed {
            debug!("Bundle marked dirty by page {}", page);
            state.dirty = true;
        }
        Ok(changed)
    }

    /// Adds an asset to every page.
    pub fn add_required_asset(&self, asset: AssetRef) -> Result<()> {
        let mut state = self.lock()?;
        if !state.required.iter().any(|a| a.id() == asset.id()) {
            state.required.push(asset);
        }
        state.dirty = true;
        Ok(())
    }

    /// Keeps only the pages for which `keep` returns true.
    pub fn retain_pages<F: Fn(&str) -> bool>(&self, keep: F) -> Result<Vec<String>> {
        let mut state = self.lock()?;
        let removed: Vec<String> = state.order.iter().filter(|p| !keep(p.as_str())).cloned().collect();
        if removed.is_empty() {
            return Ok(removed);
        }
        for page in &removed {
            state.pages.remove(page);
        }
        state.order.retain(|p| keep(p.as_str()));
        state.dirty = true;
        Ok(removed)
    }

    /// Returns the current bundle, rebuilding it first if dirty.
    pub fn snapshot(&self) -> Result<Arc<Bundle>> {
        let mut state = self.lock()?;
        if state.dirty {
            let bundle = Arc::new(self.rebuild(&state));
            state.bundle = bundle;
            state.dirty = false;
        }
        Ok(state.bundle.clone())
    }

    /// Ordered assets of one type for a page.
    pub fn assets(&self, page: &str, kind: AssetType) -> Result<Vec<BundledAsset>> {
        Ok(self.snapshot()?.assets(page, kind))
    }

    /// Global lookup by resolved name.
    pub fn asset_by_name(&self, name: &str) -> Result<Option<AssetRef>> {
        Ok(self.snapshot()?.asset(name).cloned())
    }

    /// Dependency cycles found by the latest rebuild.
    pub fn cycles(&self) -> Result<Vec<CycleReport>> {
        Ok(self.snapshot()?.cycles().to_vec())
    }

    fn rebuild(&self, state: &BundlerState) -> Bundle {
        let mut names: HashMap<AssetId, String> = HashMap::new();
        let mut index: HashMap<String, AssetRef> = HashMap::new();

        let mut assign = |asset: &AssetRef| {
            if names.contains_key(&asset.id()) {
                return;
            }
            let mut name = asset.name().to_string();
            while index.get(&name).is_some_and(|existing| existing.id() != asset.id()) {
                name = format!("{}-{}", name, &sha256_hex(name.as_bytes())[..8]);
            }
            index.insert(name.clone(), asset.clone());
            names.insert(asset.id(), name);
        };

        for page in &state.order {
            if let Some(assets) = state.pages.get(page) {
                assets.ordered(self.asset_order).for_each(&mut assign);
            }
        }
        state.required.iter().for_each(&mut assign);

        let mut cycles = Vec::new();
        let mut pages = HashMap::new();
        for page in &state.order {
            let Some(assets) = state.pages.get(page) else {
                continue;
            };
            let members: Vec<&AssetRef> = assets
                .ordered(self.asset_order)
                .chain(state.required.iter())
                .collect();
            pages.insert(page.clone(), order_page(page, &members, &mut cycles));
        }
        let required: Vec<&AssetRef> = state.required.iter().collect();
        let required = order_page(REQUIRED_BUNDLE, &required, &mut cycles);

        let generation = state.bundle.generation + 1;
        debug!(
            "Rebuilt bundle generation {} ({} pages, {} assets, {} cycles)",
            generation,
            pages.len(),
            index.len(),
            cycles.len()
        );

        Bundle {
            generation,
            names,
            index,
            pages,
            required,
            cycles,
        }
    }
}

fn order_page(page: &str, members: &[&AssetRef], cycles: &mut Vec<CycleReport>) -> PageBundle {
    let mut seen = HashSet::new();
    let members: Vec<&AssetRef> = members.iter().copied().filter(|a| seen.insert(a.id())).collect();

    let mut bundle = PageBundle::default();
    for kind in [AssetType::Javascript, AssetType::Stylesheet] {
        let list: Vec<AssetRef> = members
            .iter()
            .filter(|a| a.kind() == kind)
            .map(|a| (*a).clone())
            .collect();

        let ordering = order_assets(&list);
        if !ordering.is_complete() {
            let blocked: Vec<String> = ordering
                .blocked
                .iter()
                .map(|i| list[*i].origin().to_string())
                .collect();
            warn!(
                "Dependency cycle in {} {} assets, dropping: {}",
                page,
                kind.extension(),
                blocked.join(", ")
            );
            cycles.push(CycleReport {
                page: page.to_string(),
                kind,
                blocked,
            });
        }

        let ordered = ordering.ordered.iter().map(|i| list[*i].clone()).collect();
        match kind {
            AssetType::Javascript => bundle.scripts = ordered,
            AssetType::Stylesheet => bundle.styles = ordered,
        }
    }
    bundle
}
