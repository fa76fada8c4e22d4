//! Call audio WebSocket.
//!
//! Adapts one provider socket to a [`CallSession`]: text frames become control
//! events, binary frames become caller audio, and a single writer task drains
//! the session's outbound queue back onto the socket.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::session::{CallSession, InboundEvent, OutboundFrame};
use crate::state::AppState;

/// Inbound frames buffered ahead of the session loop.
const INBOUND_BUFFER_SIZE: usize = 256;

/// Outbound frames buffered ahead of the socket writer.
const OUTBOUND_BUFFER_SIZE: usize = 256;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// `GET /socket`
pub async fn call_socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Call socket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_call_socket(socket, state))
}

async fn handle_call_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_BUFFER_SIZE);
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEvent>(INBOUND_BUFFER_SIZE);

    let writer_task = tokio::spawn(write_outbound(sender, outbound_rx));

    let session = CallSession::new(
        state.services.clone(),
        state.session_settings.clone(),
        state.registry.clone(),
        outbound_tx,
    );
    let connection_id = session.connection_id();
    let mut session_state = session.subscribe_state();
    let session_task = tokio::spawn(session.run(inbound_rx));

    info!(connection_id = %connection_id, "Call socket connected");

    loop {
        tokio::select! {
            message = receiver.next() => {
                let event = match message {
                    Some(Ok(Message::Text(text))) => InboundEvent::Control(text.to_string()),
                    Some(Ok(Message::Binary(data))) => InboundEvent::Audio(data),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(connection_id = %connection_id, "Close frame: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(connection_id = %connection_id, "Call socket error: {}", e);
                        break;
                    }
                    None => break,
                };
                if inbound_tx.send(event).await.is_err() {
                    break;
                }
            }
            // The session can finish on its own after hanging up. The borrow
            // returned by `wait_for` must not outlive this branch.
            _ = async {
                let _ = session_state.wait_for(|state| state.is_closed()).await;
            } => break,
        }
    }

    drop(inbound_tx);
    if let Err(e) = session_task.await {
        error!(connection_id = %connection_id, "Call session task failed: {}", e);
    }
    writer_task.abort();

    info!(connection_id = %connection_id, "Call socket closed");
}

/// Drain the outbound queue onto the socket, in order.
async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundFrame>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        let result = match frame {
            OutboundFrame::Audio(data) => sender.send(Message::Binary(data)).await,
            OutboundFrame::KeepAlive => sender.send(Message::Text(String::new().into())).await,
            OutboundFrame::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
        };

        if let Err(e) = result {
            debug!("Call socket write failed: {}", e);
            break;
        }
    }

    let _ = sender.close().await;
}
