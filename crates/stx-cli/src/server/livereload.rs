// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! WebSocket handler for live reload functionality.

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::broadcast;
use tracing::debug;

/// What the browser should refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Reload the whole page.
    Page,
    /// Re-fetch stylesheets only.
    Css,
}

impl ReloadEvent {
    /// Wire form sent to the client.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadEvent::Page => "page",
            ReloadEvent::Css => "css",
        }
    }
}

/// Handles a WebSocket connection for live reload notifications.
pub async fn handle_websocket(mut socket: WebSocket, mut rx: broadcast::Receiver<ReloadEvent>) {
    debug!("Live reload client connected");
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if socket.send(Message::Text(event.as_str().to_string())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Only the latest state matters
                        continue;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
    debug!("Live reload client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(ReloadEvent::Page.as_str(), "page");
        assert_eq!(ReloadEvent::Css.as_str(), "css");
    }
}
