//! Live metrics over WebSocket.
//!
//! # Data Flow
//! ```text
//! MetricsHub ──try_send──→ per-socket channel ──JSON text frame──→ client
//! ```
//!
//! # Design Decisions
//! - One hub subscription per socket, dropped when the socket task ends
//! - Inbound frames are only watched for close; content is ignored
//! - A send error ends the session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::admin::AppState;

pub async fn realtime_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_metrics(socket, state))
}

async fn stream_metrics(socket: WebSocket, state: AppState) {
    let session = Uuid::new_v4();
    let (subscription, mut samples) = state
        .hub
        .subscribe_channel(state.config.metrics.subscriber_buffer);
    tracing::info!(%session, subscriber = subscription.id(), "Realtime session opened");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            sample = samples.recv() => {
                let Some(sample) = sample else { break };
                let frame = match serde_json::to_string(sample.as_ref()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(%session, error = %e, "Could not encode metrics sample");
                        continue;
                    }
                };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    drop(subscription);
    tracing::info!(%session, "Realtime session closed");
}
