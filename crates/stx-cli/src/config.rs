// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! stx project configuration.
//!
//! Configuration is loaded from `stx.toml` at the project root.
//!
//! # Example Configuration
//!
//! ```toml
//! [project]
//! name = "my-site"
//!
//! [[sources]]
//! dir = "web"
//!
//! [[sources]]
//! dir = "vendor/theme"
//! root = "site"
//! priority = -10
//!
//! [server]
//! port = 3000
//! host = "127.0.0.1"
//!
//! [site]
//! default_layout = "root"
//! asset_order = "layout-first"
//!
//! [live_reload]
//! debounce = 200
//! reload_css = true
//!
//! [globals]
//! site_name = "My Site"
//! ```

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use stx::SiteOptions;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "stx.toml";

/// Main configuration structure loaded from `stx.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Project metadata.
    #[serde(default)]
    pub project: ProjectConfig,
    /// Content sources, overlaid by priority.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Site conventions.
    #[serde(default)]
    pub site: SiteOptions,
    /// Live reload settings (dev only).
    #[serde(default)]
    pub live_reload: LiveReloadConfig,
    /// Values available to every template.
    #[serde(default)]
    pub globals: Map<String, Value>,
}

/// Project metadata configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project name.
    #[serde(default = "default_project_name")]
    pub name: String,
}

/// A directory mounted into the site.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Directory, relative to the project root.
    pub dir: String,
    /// Subdirectory of `dir` exposed as the site root (default: `dir`
    /// itself). With `dir = "theme"` and `root = "site"`,
    /// `theme/site/index.html` serves `/`.
    #[serde(default)]
    pub root: String,
    /// Higher priorities shadow lower ones (default: 0).
    #[serde(default)]
    pub priority: i32,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 3000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Server host (default: "127.0.0.1").
    #[serde(default = "default_host")]
    pub host: String,
}

/// Live reload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveReloadConfig {
    /// Turns live reload off in `stx dev`.
    #[serde(default)]
    pub disabled: bool,
    /// Client reconnect interval in milliseconds (default: 100).
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// File event debounce in milliseconds (default: 200).
    #[serde(default = "default_debounce")]
    pub debounce: u64,
    /// WebSocket endpoint (default: "/__livereload").
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Reload the whole page on stylesheet changes instead of swapping
    /// stylesheets in place.
    #[serde(default)]
    pub reload_css: bool,
    /// Changed files must match one of these globs to trigger a reload.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

fn default_project_name() -> String {
    "unnamed".to_string()
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig::default()]
}

fn default_source_dir() -> String {
    "web".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_interval() -> u64 {
    100
}

fn default_debounce() -> u64 {
    200
}

fn default_endpoint() -> String {
    "/__livereload".to_string()
}

fn default_patterns() -> Vec<String> {
    vec![
        "**/*.html".to_string(),
        "**/*.js".to_string(),
        "**/*.css".to_string(),
    ]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
            root: String::new(),
            priority: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            interval: default_interval(),
            debounce: default_debounce(),
            endpoint: default_endpoint(),
            reload_css: false,
            patterns: default_patterns(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            sources: default_sources(),
            server: ServerConfig::default(),
            site: SiteOptions::default(),
            live_reload: LiveReloadConfig::default(),
            globals: Map::new(),
        }
    }
}

impl Config {
    /// Loads configuration from `stx.toml` in the current directory.
    ///
    /// If no configuration file exists, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&std::env::current_dir()?)
    }

    /// Loads configuration from `stx.toml` in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let config_path = dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", config_path.display(), e))?;
        Ok(config)
    }

    /// Absolute directories of all sources, relative to `base`.
    pub fn source_dirs(&self, base: &Path) -> Vec<PathBuf> {
        self.sources.iter().map(|s| base.join(&s.dir)).collect()
    }
}

impl LiveReloadConfig {
    /// Compiles the watch patterns.
    pub fn glob_set(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }
}
