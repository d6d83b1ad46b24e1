// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Serves bundled assets by resolved name.
//!
//! Below the asset mount, `/js/{name}.js` serves a script and
//! `/css/{name}.css` a stylesheet. Unknown names, type mismatches and url
//! assets are 404s; any other path under the mount is a 501.

use tracing::debug;

use crate::asset::AssetType;
use crate::bundler::Bundler;
use crate::response::SiteResponse;

/// A parsed request below the asset mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRequest<'a> {
    /// A typed lookup.
    Asset {
        /// Type implied by the path.
        kind: AssetType,
        /// Name without extension.
        name: &'a str,
    },
    /// A typed directory with the wrong or no extension.
    Invalid,
    /// Neither `/js/` nor `/css/`.
    Unsupported,
}

/// Returns the part of `path` below `mount`, or `None` when `path` is not
/// under it.
pub fn strip_mount<'a>(mount: &str, path: &'a str) -> Option<&'a str> {
    let mount = mount.trim_end_matches('/');
    let rest = path.strip_prefix(mount)?;
    if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Parses the path below the mount, e.g. `/js/app.js`.
pub fn parse_asset_path(rest: &str) -> AssetRequest<'_> {
    for kind in [AssetType::Javascript, AssetType::Stylesheet] {
        let ext = kind.extension();
        let Some(file) = rest
            .strip_prefix('/')
            .and_then(|r| r.strip_prefix(ext))
            .and_then(|r| r.strip_prefix('/'))
        else {
            continue;
        };
        return match file.strip_suffix(ext).and_then(|f| f.strip_suffix('.')) {
            Some(name) if !name.is_empty() && !name.contains('/') => AssetRequest::Asset { kind, name },
            _ => AssetRequest::Invalid,
        };
    }
    AssetRequest::Unsupported
}

/// Serves the asset addressed by `rest`, the path below the mount.
pub fn serve_asset(bundler: &Bundler, rest: &str) -> SiteResponse {
    let (kind, name) = match parse_asset_path(rest) {
        AssetRequest::Asset { kind, name } => (kind, name),
        AssetRequest::Invalid => return SiteResponse::not_found(format!("Asset not found: {}", rest)),
        AssetRequest::Unsupported => {
            return SiteResponse::not_implemented(format!("Unsupported asset path: {}", rest))
        }
    };

    let asset = match bundler.asset_by_name(name) {
        Ok(Some(asset)) => asset,
        Ok(None) => return SiteResponse::not_found(format!("Asset not found: {}", rest)),
        Err(e) => return SiteResponse::internal_error(e.to_string()),
    };

    if asset.kind() != kind {
        debug!("Asset {} is not a {} asset", name, kind.extension());
        return SiteResponse::not_found(format!("Asset not found: {}", rest));
    }

    match asset.content() {
        Some(content) => SiteResponse::asset(kind.content_type(), content.to_vec()),
        None => SiteResponse::not_found(format!("Asset {} is external", name)),
    }
}
