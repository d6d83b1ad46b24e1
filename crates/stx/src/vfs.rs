// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Layered virtual file system.
//!
//! A [`Vfs`] overlays several [`Source`]s. Each source is mounted with a root
//! prefix (the subtree of the source exposed at `/`) and a priority; higher
//! priorities shadow lower ones and ties keep registration order.
//!
//! Lookups remember which mount last satisfied a logical path. Only that
//! source affinity is cached, never file contents, so edits are visible on
//! the next read. A cached mount that reports NotFound is evicted and the
//! lookup falls through to a full scan.

use std::collections::{BTreeSet, HashSet};
use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use lru::LruCache;
use tracing::debug;

use crate::error::{Result, StxError};
use crate::source::Source;

/// Default capacity of the lookup cache.
pub const DEFAULT_LOOKUP_CACHE_SIZE: usize = 1024;

/// Normalizes a logical path.
///
/// The result always starts with `/`, uses single slashes and has `.` and
/// `..` segments resolved. `..` never climbs above the root.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Resolves `target` relative to the file at `base`.
///
/// Absolute targets are only normalized.
pub fn join_path(base: &str, target: &str) -> String {
    if target.starts_with('/') {
        return normalize_path(target);
    }
    let base = normalize_path(base);
    let dir = match base.rfind('/') {
        Some(idx) => &base[..idx],
        None => "",
    };
    normalize_path(&format!("{}/{}", dir, target))
}

/// A source mounted into the VFS.
#[derive(Debug)]
pub struct Mount {
    source: Arc<dyn Source>,
    root: String,
    priority: i32,
    seq: u64,
    ignored: Mutex<BTreeSet<String>>,
}

impl Mount {
    /// The mounted source.
    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    /// Root prefix inside the source, without leading or trailing slash.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Mount priority; higher wins.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Logical directories excluded from page discovery by the last walk.
    pub fn ignored(&self) -> Vec<String> {
        self.ignored
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Maps a normalized logical path to the path inside the source.
    fn source_path(&self, logical: &str) -> String {
        let relative = logical.trim_start_matches('/');
        if self.root.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.root, relative)
        }
    }

    /// Maps a path inside the source back to a logical path.
    fn logical_path(&self, source_path: &str) -> Option<String> {
        if self.root.is_empty() {
            return Some(normalize_path(source_path));
        }
        source_path
            .strip_prefix(&self.root)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .map(normalize_path)
    }

    fn open(&self, logical: &str) -> io::Result<Vec<u8>> {
        self.source.open(&self.source_path(logical))
    }
}

/// The layered virtual file system.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use stx::{DirSource, Vfs};
///
/// let vfs = Vfs::new();
/// vfs.register(Arc::new(DirSource::new("./theme")), "", 0)?;
/// vfs.register(Arc::new(DirSource::new("./web")), "", 10)?;
///
/// // ./web/index.html shadows ./theme/index.html
/// let bytes = vfs.resolve("/index.html")?;
/// ```
#[derive(Debug)]
pub struct Vfs {
    mounts: RwLock<Vec<Arc<Mount>>>,
    lookup: Mutex<LruCache<String, Arc<Mount>>>,
    next_seq: AtomicU64,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// Creates an empty VFS with the default lookup cache size.
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_LOOKUP_CACHE_SIZE)
    }

    /// Creates an empty VFS whose lookup cache holds `size` paths.
    pub fn with_cache_size(size: usize) -> Self {
        let size = NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN);
        Self {
            mounts: RwLock::new(Vec::new()),
            lookup: Mutex::new(LruCache::new(size)),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Mounts `source` with the given root prefix and priority.
    ///
    /// The mount is inserted after every mount of equal or higher priority.
    /// Existing cache entries are left alone.
    pub fn register(&self, source: Arc<dyn Source>, root: &str, priority: i32) -> Result<()> {
        let mount = Arc::new(Mount {
            root: root.trim_matches('/').to_string(),
            priority,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            ignored: Mutex::new(BTreeSet::new()),
            source,
        });

        let mut mounts = self.mounts.write().map_err(|_| StxError::lock("vfs mounts"))?;
        let index = mounts
            .iter()
            .position(|m| m.priority < mount.priority)
            .unwrap_or(mounts.len());
        debug!(
            "Mounted {} source at priority {} (root '{}', seq {})",
            mount.source.kind(),
            mount.priority,
            mount.root,
            mount.seq
        );
        mounts.insert(index, mount);
        Ok(())
    }

    /// Snapshot of the mounts in lookup order.
    pub fn mounts(&self) -> Result<Vec<Arc<Mount>>> {
        Ok(self
            .mounts
            .read()
            .map_err(|_| StxError::lock("vfs mounts"))?
            .clone())
    }

    /// Reads the file at a logical path from the highest priority source
    /// that provides it.
    pub fn resolve(&self, path: &str) -> Result<Vec<u8>> {
        let key = normalize_path(path);

        let cached = self
            .lookup
            .lock()
            .map_err(|_| StxError::lock("vfs lookup"))?
            .get(&key)
            .cloned();

        if let Some(mount) = cached {
            match mount.open(&key) {
                Ok(bytes) => {
                    debug!("VFS cache hit: {}", key);
                    return Ok(bytes);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("VFS evicting stale entry: {}", key);
                    self.lookup
                        .lock()
                        .map_err(|_| StxError::lock("vfs lookup"))?
                        .pop(&key);
                }
                Err(e) => return Err(e.into()),
            }
        }

        for mount in self.mounts()? {
            match mount.open(&key) {
                Ok(bytes) => {
                    debug!("VFS cache miss: {} -> {} source", key, mount.source.kind());
                    self.lookup
                        .lock()
                        .map_err(|_| StxError::lock("vfs lookup"))?
                        .put(key, mount);
                    return Ok(bytes);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(StxError::FileNotFound(key))
    }

    /// Reads a logical path as UTF-8 text.
    pub fn resolve_string(&self, path: &str) -> Result<String> {
        let bytes = self.resolve(path)?;
        String::from_utf8(bytes).map_err(|e| {
            StxError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: {}", normalize_path(path), e),
            ))
        })
    }

    /// Returns true if some source provides the logical path.
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Drops every cached source affinity.
    pub fn clear_cache(&self) -> Result<()> {
        self.lookup
            .lock()
            .map_err(|_| StxError::lock("vfs lookup"))?
            .clear();
        Ok(())
    }

    /// Walks every source and returns the logical paths of page files.
    ///
    /// Directories whose name starts with `marker` are recorded as ignored
    /// on their mount and nothing below them is returned. Paths are returned
    /// once, in mount order, so a path shadowed by a higher priority source
    /// is attributed to that source.
    pub fn discover(&self, marker: &str, extension: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut pages = Vec::new();

        for mount in self.mounts()? {
            let mut ignored = BTreeSet::new();

            for entry in mount.source.entries()? {
                let Some(logical) = mount.logical_path(&entry.path) else {
                    continue;
                };
                if logical == "/" {
                    continue;
                }

                let segments: Vec<&str> = logical.trim_start_matches('/').split('/').collect();
                let dir_depth = if entry.is_dir { segments.len() } else { segments.len() - 1 };
                if let Some(pos) = segments[..dir_depth]
                    .iter()
                    .position(|s| !marker.is_empty() && s.starts_with(marker))
                {
                    ignored.insert(format!("/{}", segments[..=pos].join("/")));
                    continue;
                }

                if entry.is_dir || !logical.ends_with(extension) {
                    continue;
                }
                if seen.insert(logical.clone()) {
                    pages.push(logical);
                }
            }

            debug!(
                "Discovered {} ignored subtrees in {} source",
                ignored.len(),
                mount.source.kind()
            );
            *mount.ignored.lock().map_err(|_| StxError::lock("vfs ignored"))? = ignored;
        }

        Ok(pages)
    }
}
