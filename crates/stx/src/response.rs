// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Transport independent responses.
//!
//! [`crate::Site::handle`] returns one of these for every request. HTTP
//! adapters convert it to their own response type.

use std::collections::HashMap;

/// The outcome of handling a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteResponse {
    /// A rendered page.
    Html {
        /// HTTP status code
        status: u16,
        /// Extra HTTP headers
        headers: HashMap<String, String>,
        /// HTML body
        body: String,
    },

    /// Raw asset bytes.
    Asset {
        /// Content type of the asset kind
        content_type: &'static str,
        /// Asset content
        body: Vec<u8>,
    },

    /// Redirect to the canonical route.
    Redirect {
        /// HTTP status code
        status: u16,
        /// Redirect location
        location: String,
    },

    /// Error response
    Error {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },
}

impl SiteResponse {
    /// Creates an HTML response.
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::Html {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Creates an asset response.
    pub fn asset(content_type: &'static str, body: Vec<u8>) -> Self {
        Self::Asset { content_type, body }
    }

    /// Creates a permanent redirect.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            status: 301,
            location: location.into(),
        }
    }

    /// Creates an error response.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::Error {
            status,
            message: message.into(),
        }
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(404, message)
    }

    /// Creates a 501 Not Implemented response.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::error(501, message)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::error(500, message)
    }

    /// Returns the status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Html { status, .. } => *status,
            Self::Asset { .. } => 200,
            Self::Redirect { status, .. } => *status,
            Self::Error { status, .. } => *status,
        }
    }

    /// Content type of the body.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Html { .. } => "text/html; charset=utf-8",
            Self::Asset { content_type, .. } => content_type,
            Self::Redirect { .. } | Self::Error { .. } => "text/plain; charset=utf-8",
        }
    }

    /// Body bytes as they would be written for a GET request.
    pub fn body_bytes(&self) -> &[u8] {
        match self {
            Self::Html { body, .. } => body.as_bytes(),
            Self::Asset { body, .. } => body,
            Self::Redirect { .. } => &[],
            Self::Error { message, .. } => message.as_bytes(),
        }
    }

    /// Adds a header to the response (only for the Html variant).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Html { headers, .. } = &mut self {
            headers.insert(key.into(), value.into());
        }
        self
    }
}
