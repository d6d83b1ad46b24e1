// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Byte sources mounted into the virtual file system.
//!
//! This module provides the [`Source`] trait and the three containers a site
//! is usually assembled from.
//!
//! # Source Implementations
//!
//! - [`DirSource`]: A directory on disk (project content, live editing)
//! - [`MemorySource`]: A mutable in-memory map (tests, generated content)
//! - [`EmbeddedSource`]: An `include_dir` archive compiled into the binary
//!
//! # Paths
//!
//! Every path handed to a source is relative to the source's own root, uses
//! forward slashes and carries no leading slash (`about/index.html`). A
//! missing file is reported as [`std::io::ErrorKind::NotFound`]; the VFS
//! relies on that to fall through to the next source.
//!
//! Implement [`Source`] for custom containers (archives, databases, etc.).

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use include_dir::{Dir, DirEntry};

use crate::error::{Result, StxError};

/// One entry reported by [`Source::entries`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceEntry {
    /// Path relative to the source root, forward slashes, no leading slash.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl SourceEntry {
    /// Creates a file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into(), is_dir: false }
    }

    /// Creates a directory entry.
    pub fn dir(path: impl Into<String>) -> Self {
        Self { path: path.into(), is_dir: true }
    }

    /// Returns the last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A byte-addressable container of files.
///
/// Implementations must be thread-safe: sources are shared by every request
/// handler through the VFS.
pub trait Source: Send + Sync + fmt::Debug + 'static {
    /// Reads the whole file at `path`.
    ///
    /// Returns an error of kind [`io::ErrorKind::NotFound`] when the file
    /// does not exist.
    fn open(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Lists every file and directory below the source root.
    fn entries(&self) -> Result<Vec<SourceEntry>>;

    /// Short label used in log output.
    fn kind(&self) -> &'static str;
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path))
}

/// Converts a relative path to a forward-slash string.
fn relative_to_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Filesystem directory source.
///
/// # Examples
///
/// ```rust,ignore
/// use stx::DirSource;
///
/// let source = DirSource::new("./web");
/// let bytes = source.open("about/index.html")?;
/// ```
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Creates a source rooted at the given directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Returns the directory this source reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        // Security: keep every read inside the root directory
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("Path '{}' escapes the source root", path),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl Source for DirSource {
    fn open(&self, path: &str) -> io::Result<Vec<u8>> {
        let full_path = self.full_path(path)?;
        if !full_path.is_file() {
            return Err(not_found(path));
        }
        std::fs::read(&full_path)
    }

    fn entries(&self) -> Result<Vec<SourceEntry>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(&self.root.to_string_lossy())
        );
        let paths = glob::glob(&pattern).map_err(|e| StxError::Discovery(e.to_string()))?;

        let mut entries = Vec::new();
        for path in paths {
            let path = path.map_err(|e| StxError::Discovery(e.to_string()))?;
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative_to_string(relative);
            if relative.is_empty() {
                continue;
            }
            entries.push(SourceEntry {
                path: relative,
                is_dir: path.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }

    fn kind(&self) -> &'static str {
        "dir"
    }
}

/// In-memory source backed by a shared map.
///
/// Clones share the same storage, so a test can keep a handle and add or
/// remove files after the source has been mounted.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemorySource {
    /// Creates an empty memory source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn add_file(&self, path: &str, content: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.trim_start_matches('/').to_string(), content.into());
        }
    }

    /// Builder-style variant of [`MemorySource::add_file`].
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, content);
        self
    }

    /// Removes a file, returning whether it existed.
    pub fn remove_file(&self, path: &str) -> bool {
        self.files
            .lock()
            .map(|mut files| files.remove(path.trim_start_matches('/')).is_some())
            .unwrap_or(false)
    }
}

impl Source for MemorySource {
    fn open(&self, path: &str) -> io::Result<Vec<u8>> {
        let files = self
            .files
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory source lock poisoned"))?;
        files
            .get(path.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn entries(&self) -> Result<Vec<SourceEntry>> {
        let files = self.files.lock().map_err(|_| StxError::lock("memory source"))?;

        let mut entries = BTreeSet::new();
        for path in files.keys() {
            let mut prefix = String::new();
            let segments: Vec<&str> = path.split('/').collect();
            for segment in &segments[..segments.len().saturating_sub(1)] {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(segment);
                entries.insert(SourceEntry::dir(prefix.clone()));
            }
            entries.insert(SourceEntry::file(path.clone()));
        }
        Ok(entries.into_iter().collect())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

/// Source over a directory embedded with [`include_dir::include_dir!`].
#[derive(Debug, Clone)]
pub struct EmbeddedSource {
    dir: &'static Dir<'static>,
}

impl EmbeddedSource {
    /// Wraps an embedded directory.
    pub fn new(dir: &'static Dir<'static>) -> Self {
        Self { dir }
    }

    fn collect(dir: &Dir<'_>, entries: &mut Vec<SourceEntry>) {
        for entry in dir.entries() {
            match entry {
                DirEntry::Dir(child) => {
                    entries.push(SourceEntry::dir(relative_to_string(child.path())));
                    Self::collect(child, entries);
                }
                DirEntry::File(file) => {
                    entries.push(SourceEntry::file(relative_to_string(file.path())));
                }
            }
        }
    }
}

impl Source for EmbeddedSource {
    fn open(&self, path: &str) -> io::Result<Vec<u8>> {
        self.dir
            .get_file(path.trim_start_matches('/'))
            .map(|file| file.contents().to_vec())
            .ok_or_else(|| not_found(path))
    }

    fn entries(&self) -> Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        Self::collect(self.dir, &mut entries);
        entries.sort();
        Ok(entries)
    }

    fn kind(&self) -> &'static str {
        "embedded"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dir_source_open_and_entries() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("_layout")).unwrap();
        fs::write(temp_dir.path().join("index.html"), "<h1>Home</h1>").unwrap();
        fs::write(temp_dir.path().join("_layout/root.html"), "{@html content}").unwrap();

        let source = DirSource::new(temp_dir.path());
        assert_eq!(source.open("index.html").unwrap(), b"<h1>Home</h1>");
        assert_eq!(source.open("/_layout/root.html").unwrap(), b"{@html content}");

        let entries = source.entries().unwrap();
        assert!(entries.contains(&SourceEntry::dir("_layout")));
        assert!(entries.contains(&SourceEntry::file("_layout/root.html")));
        assert!(entries.contains(&SourceEntry::file("index.html")));
    }

    #[test]
    fn test_dir_source_not_found() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("blog")).unwrap();
        let source = DirSource::new(temp_dir.path());

        let err = source.open("missing.html").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        // Directories are not files
        let err = source.open("blog").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_dir_source_rejects_parent_escape() {
        let temp_dir = TempDir::new().unwrap();
        let source = DirSource::new(temp_dir.path().join("web"));
        let err = source.open("../secret.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_dir_source_missing_root_is_empty() {
        let source = DirSource::new("/definitely/not/a/real/stx/dir");
        assert!(source.entries().unwrap().is_empty());
    }

    #[test]
    fn test_memory_source_entries_include_parent_dirs() {
        let source = MemorySource::new()
            .with_file("blog/post1/index.html", "post")
            .with_file("/index.html", "home");

        let entries = source.entries().unwrap();
        assert_eq!(
            entries,
            vec![
                SourceEntry::dir("blog"),
                SourceEntry::dir("blog/post1"),
                SourceEntry::file("blog/post1/index.html"),
                SourceEntry::file("index.html"),
            ]
        );
    }

    #[test]
    fn test_memory_source_shared_between_clones() {
        let source = MemorySource::new();
        let handle = source.clone();
        handle.add_file("x.html", "x");
        assert_eq!(source.open("x.html").unwrap(), b"x");

        assert!(handle.remove_file("x.html"));
        assert_eq!(source.open("x.html").unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(SourceEntry::dir("a/_partials").name(), "_partials");
        assert_eq!(SourceEntry::file("index.html").name(), "index.html");
    }
}
