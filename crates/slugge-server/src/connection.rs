//! Assistant WebSocket connections.
//!
//! Each socket is split into a reader, a writer and an assistant session
//! task. The reader forwards decoded text to the session; the session's
//! replies reach the writer through a bounded channel, and the writer also
//! sends a heartbeat ping on a fixed interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use slugge_core::ids::ClientId;
use slugge_core::protocol::OutboundMessage;
use slugge_engine::AssistantService;

/// Bookkeeping for an open socket.
#[derive(Debug)]
pub struct Connection {
    pub connected_at: Instant,
}

/// Registry of open assistant connections.
pub struct ConnectionRegistry {
    connections: DashMap<ClientId, Connection>,
    max_send_queue: usize,
}

impl ConnectionRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            connections: DashMap::new(),
            max_send_queue,
        }
    }

    pub fn register(&self) -> ClientId {
        let id = ClientId::new();
        self.connections.insert(
            id.clone(),
            Connection {
                connected_at: Instant::now(),
            },
        );
        id
    }

    pub fn unregister(&self, id: &ClientId) -> Option<Duration> {
        self.connections
            .remove(id)
            .map(|(_, conn)| conn.connected_at.elapsed())
    }

    /// Number of open connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    pub fn max_send_queue(&self) -> usize {
        self.max_send_queue
    }
}

/// Run one assistant connection to completion.
pub async fn handle_ws_connection(
    socket: WebSocket,
    client_id: ClientId,
    registry: Arc<ConnectionRegistry>,
    assistant: Arc<AssistantService>,
    heartbeat: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let queue = registry.max_send_queue().max(1);
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundMessage>(queue);
    let (in_tx, in_rx) = mpsc::channel::<String>(queue);

    let session = tokio::spawn(async move { assistant.run_session(in_rx, out_tx).await });

    let writer_cid = client_id.clone();
    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat);
        ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = out_rx.recv() => {
                    let Some(msg) = msg else { break };
                    let text = match msg.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(client_id = %writer_cid, error = %e, "failed to encode outbound message");
                            continue;
                        }
                    };
                    if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    tracing::trace!(client_id = %writer_cid, "sent ping");
                }
            }
        }
    });

    let reader_cid = client_id.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let text = match msg {
                WsMessage::Text(text) => text.to_string(),
                WsMessage::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::debug!(client_id = %reader_cid, "ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                WsMessage::Close(_) => break,
                _ => continue,
            };
            if in_tx.send(text).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => {},
    }
    session.abort();

    if let Some(open_for) = registry.unregister(&client_id) {
        tracing::info!(
            client_id = %client_id,
            open_ms = open_for.as_millis() as u64,
            "assistant client disconnected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let registry = ConnectionRegistry::new(32);
        assert_eq!(registry.count(), 0);

        let a = registry.register();
        let b = registry.register();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("client_"));
        assert_eq!(registry.count(), 2);

        assert!(registry.unregister(&a).is_some());
        assert!(registry.unregister(&a).is_none());
        assert_eq!(registry.count(), 1);

        registry.unregister(&b);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn queue_size_is_configured() {
        assert_eq!(ConnectionRegistry::new(7).max_send_queue(), 7);
    }
}
