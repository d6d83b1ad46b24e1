// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! File system watching for live reload.
//!
//! `FileWatcher` watches every directory source recursively, debounces the
//! events and hands the changed paths matching the configured globs to a
//! callback.

use globset::GlobSet;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Watches source directories for changes.
pub struct FileWatcher {
    #[allow(dead_code)]
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    roots: Vec<PathBuf>,
}

impl FileWatcher {
    /// Creates a watcher over `roots`.
    ///
    /// # Arguments
    ///
    /// * `roots` - Directories to watch recursively; missing ones are skipped
    /// * `debounce` - Quiet period before events are delivered
    /// * `patterns` - Paths relative to their root must match to be reported
    /// * `on_change` - Receives the matching paths, relative to their root
    pub fn new<F>(
        roots: Vec<PathBuf>,
        debounce: Duration,
        patterns: GlobSet,
        on_change: F,
    ) -> anyhow::Result<Self>
    where
        F: Fn(Vec<PathBuf>) + Send + 'static,
    {
        let watched: Vec<PathBuf> = roots.iter().filter(|r| r.is_dir()).cloned().collect();
        let filter_roots = watched.clone();

        let mut debouncer = new_debouncer(
            debounce,
            None,
            move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
                Ok(events) => {
                    let paths = events.iter().flat_map(|e| e.paths.iter());
                    let changed = matching_paths(paths, &filter_roots, &patterns);
                    if !changed.is_empty() {
                        debug!("Changed: {:?}", changed);
                        on_change(changed);
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!("Watch error: {}", e);
                    }
                }
            },
        )?;

        for root in &watched {
            debouncer.watch(root.as_path(), RecursiveMode::Recursive)?;
            debug!("Watching {}", root.display());
        }

        Ok(Self {
            debouncer,
            roots: watched,
        })
    }

    /// Directories being watched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Relative paths of `paths` under one of `roots` that match `patterns`,
/// deduplicated in first-seen order.
pub fn matching_paths<'a>(
    paths: impl Iterator<Item = &'a PathBuf>,
    roots: &[PathBuf],
    patterns: &GlobSet,
) -> Vec<PathBuf> {
    let mut changed: Vec<PathBuf> = Vec::new();
    for path in paths {
        let Some(relative) = roots.iter().find_map(|root| relative_to(path, root)) else {
            continue;
        };
        if patterns.is_match(&relative) && !changed.contains(&relative) {
            changed.push(relative);
        }
    }
    changed
}

fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}

/// True when every changed path is a stylesheet.
pub fn only_stylesheets(paths: &[PathBuf]) -> bool {
    !paths.is_empty()
        && paths
            .iter()
            .all(|p| p.extension().and_then(|e| e.to_str()) == Some("css"))
}
