//! WebSocket streaming of stored records.
//!
//! Subscribers get every record stored after they attach, as JSON text
//! frames. The hub is lossy: a subscriber that falls behind gets a lag
//! notice and keeps receiving from the current position.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::engine::MetricsEngine;

pub async fn stream_upgrade(State(engine): State<MetricsEngine>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_stream(engine, socket))
}

async fn run_stream(engine: MetricsEngine, mut socket: WebSocket) {
    let mut events = engine.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                let text = match event {
                    Ok(event) => match serde_json::to_string(&event.record) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "metric event serialization failed");
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "stream subscriber lagged");
                        json!({ "type": "lagged", "skipped": skipped }).to_string()
                    }
                    Err(RecvError::Closed) => break,
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // clients only ever close or ping; ignore the rest
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
