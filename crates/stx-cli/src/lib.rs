// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! stx CLI library.
//!
//! This crate provides the command-line interface for stx sites: project
//! scaffolding, a development server with live reload, a plain server and a
//! route listing.
//!
//! # Usage
//!
//! This crate is primarily used through the `stx` binary:
//!
//! ```bash
//! stx init      # Scaffold a new project
//! stx dev       # Start development server
//! stx serve     # Serve without live reload
//! stx routes    # List routes and their bundles
//! ```
//!
//! # Configuration
//!
//! Projects are configured via `stx.toml` at the project root.

/// CLI commands (init, dev, serve, routes).
pub mod commands;
/// Project configuration from `stx.toml`.
pub mod config;
/// HTTP server and live reload.
pub mod server;
/// File system watching for live reload.
pub mod watcher;
