//! WebSocket session transport
//!
//! Each socket gets its own [`Session`](crate::session::Session). A reader
//! task forwards text frames and cancels the connection token when the
//! client goes away; the turn loop runs one message at a time and drops
//! in-flight work when the token fires.

use super::AppState;
use crate::session::{OutboundFrame, Orchestrator, TurnError};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const CHANNEL_CAPACITY: usize = 16;

pub(super) async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state.orchestrator))
}

async fn run_session(socket: WebSocket, orchestrator: Arc<Orchestrator>) {
    let mut session = orchestrator.new_session();
    let session_id = session.id();
    tracing::info!(session_id = %session_id, "Client connected");

    let (mut sink, mut stream) = socket.split();
    let cancel = CancellationToken::new();
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (frame_tx, mut frame_rx) = mpsc::channel::<OutboundFrame>(CHANNEL_CAPACITY);

    let reader = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Binary(bytes)) => {
                        tracing::debug!(session_id = %session_id, len = bytes.len(), "Ignoring binary frame");
                    }
                    Ok(Message::Ping(_) | Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        tracing::debug!(session_id = %session_id, error = %e, "Socket read failed");
                        break;
                    }
                }
            }
            cancel.cancel();
        })
    };

    let writer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let json = match frame.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(session_id = %session_id, error = %e, "Failed to encode frame");
                        continue;
                    }
                };
                if sink.send(Message::Text(json)).await.is_err() {
                    cancel.cancel();
                    break;
                }
            }
            let _ = sink.close().await;
        })
    };

    loop {
        let text = tokio::select! {
            () = cancel.cancelled() => break,
            text = inbound_rx.recv() => match text {
                Some(text) => text,
                None => break,
            },
        };

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(session_id = %session_id, "Connection closed mid-turn, abandoning work");
                break;
            }
            result = orchestrator.handle(&mut session, &text, &frame_tx) => match result {
                Ok(()) => {}
                Err(TurnError::Closed) => break,
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Unexpected internal fault");
                }
            },
        }
    }

    drop(frame_tx);
    reader.abort();
    if let Err(e) = writer.await {
        if e.is_panic() {
            tracing::error!(session_id = %session_id, error = %e, "Socket writer panicked");
        }
    }

    tracing::info!(
        session_id = %session_id,
        turns = session.history().len(),
        model_calls = session.ledger().calls(),
        total_spent = session.total_spent(),
        "Client disconnected"
    );
}
