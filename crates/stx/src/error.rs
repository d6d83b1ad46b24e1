// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for stx.
//!
//! This module defines [`StxError`], the single error enum returned by every
//! fallible operation in the crate.
//!
//! # Error Categories
//!
//! - **Resolution errors**: a logical path is not provided by any source
//! - **Compile errors**: a template or its layout could not be compiled
//! - **Render errors**: a compiled template failed while executing
//! - **Routing errors**: a page could not be registered
//!
//! Asset name collisions are not errors at all, and dependency cycles are
//! reported through [`crate::bundler::CycleReport`] rather than failing.

use thiserror::Error;

/// The main error type for stx operations.
#[derive(Error, Debug)]
pub enum StxError {
    /// No registered source provides the logical path.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A source failed for a reason other than a missing file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The template system rejected a template.
    #[error("Template compile error in {path}: {message}")]
    TemplateCompile {
        /// Logical path of the template.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// A page names a layout that does not exist.
    #[error("Layout '{layout}' not found (required by {page})")]
    LayoutNotFound {
        /// Normalized layout name.
        layout: String,
        /// Logical path of the page requesting it.
        page: String,
    },

    /// A compiled template failed during execution.
    #[error("Render error in {path}: {message}")]
    Render {
        /// Logical path of the template.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// A route could not be registered.
    #[error("Route error: {0}")]
    Route(String),

    /// Walking a source for pages failed.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// A shared lock was poisoned by a panicking thread.
    #[error("Lock error: {0}")]
    Lock(String),

    /// Scope values could not be converted.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StxError {
    /// Returns true if this error means the requested file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StxError::FileNotFound(_) => true,
            StxError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub(crate) fn compile(path: impl Into<String>, message: impl Into<String>) -> Self {
        StxError::TemplateCompile {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn lock(what: &str) -> Self {
        StxError::Lock(format!("Failed to acquire {} lock", what))
    }
}

/// Convenience type alias for Results with [`StxError`].
pub type Result<T> = std::result::Result<T, StxError>;
