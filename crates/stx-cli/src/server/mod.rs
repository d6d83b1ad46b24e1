// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP server components.
//!
//! # Components
//!
//! - `http`: axum adapter around [`stx::Site::handle`]
//! - `livereload`: WebSocket-based live reload

/// HTTP server implementation using Axum.
pub mod http;
/// Live reload WebSocket server.
pub mod livereload;
