//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::broadcast::Frame;
use crate::game::ArenaHandle;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::ServerMsg;

/// Frames buffered per connection before deliveries start being dropped
const OUTBOUND_BUFFER: usize = 64;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.arena))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, arena: ArenaHandle) {
    let (mut ws_sink, ws_stream) = socket.split();
    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(OUTBOUND_BUFFER);

    let ack = match arena.join(frame_tx).await {
        Ok(ack) => ack,
        Err(e) => {
            error!(error = %e, "Failed to join arena");
            return;
        }
    };
    let player_id = ack.player_id;
    info!(player_id, "New WebSocket connection");

    // Welcome goes out directly, ahead of any delayed snapshot
    if let Err(e) = send_msg(&mut ws_sink, &ack.welcome).await {
        error!(player_id, error = %e, "Failed to send welcome");
        arena.leave(player_id).await;
        return;
    }

    run_session(player_id, &arena, ws_sink, ws_stream, frame_rx).await;

    // Cleanup on disconnect
    arena.leave(player_id).await;

    info!(player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: u64,
    arena: &ArenaHandle,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut frame_rx: mpsc::Receiver<Frame>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: delayed frames -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
                debug!(player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> inbound delay queue
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    debug!(player_id, "Rate limited inbound message");
                    continue;
                }

                if arena.submit(player_id, text).await.is_err() {
                    debug!(player_id, "Inbound channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(player_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(player_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task; its receiver drops and pending deliveries no-op
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
