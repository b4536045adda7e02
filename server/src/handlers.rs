use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};
use doodleboard_shared::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::boards::{get_or_create_board, new_board_id, normalize_board_id, release_board};
use crate::logic::{apply_client_message, broadcast_all, broadcast_except};
use crate::state::{AppState, Board};

/// Health check for load balancers and uptime monitors.
pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn root_handler() -> impl IntoResponse {
    Redirect::to(&format!("/b/{}", new_board_id()))
}

pub async fn board_handler(
    Path(board_id): Path<String>,
    axum::Extension(index_file): axum::Extension<PathBuf>,
) -> impl IntoResponse {
    if normalize_board_id(&board_id).is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    match tokio::fs::read_to_string(index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(error) => {
            warn!(%error, "failed to read index.html");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn ws_handler(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Some(board_id) = normalize_board_id(&board_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, board_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, board_id: String) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let connection_id = Uuid::new_v4();

    let board = get_or_create_board(&state, &board_id).await;
    let peers = {
        let mut board = board.write().await;
        board.peers.insert(connection_id, tx);
        board.peer_count()
    };
    info!(board_id = %board_id, conn = %connection_id, peers, "ws connected");

    match bincode::encode_to_vec(ServerMessage::Welcome { peers }, bincode::config::standard()) {
        Ok(payload) => {
            if let Err(error) = socket_sender.send(Message::Binary(payload)).await {
                warn!(
                    board_id = %board_id,
                    conn = %connection_id,
                    ?error,
                    "ws welcome send failed"
                );
            }
        }
        Err(error) => warn!(
            board_id = %board_id,
            conn = %connection_id,
            %error,
            "ws welcome encode failed"
        ),
    }
    broadcast_except(&board, connection_id, ServerMessage::Peers { count: peers }).await;

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Ok(payload) = bincode::encode_to_vec(&message, bincode::config::standard()) {
                if socket_sender.send(Message::Binary(payload)).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut close_frame = None;

    while let Some(Ok(message)) = socket_receiver.next().await {
        let parsed = match message {
            Message::Text(text) => serde_json::from_str::<ClientMessage>(&text).ok(),
            Message::Binary(data) => bincode::decode_from_slice::<ClientMessage, _>(
                &data,
                bincode::config::standard(),
            )
            .ok()
            .map(|(message, _)| message),
            Message::Close(frame) => {
                close_frame = frame;
                break;
            }
            _ => continue,
        };
        match parsed {
            Some(client_message) => {
                dispatch(&board, connection_id, client_message).await;
            }
            None => debug!(
                board_id = %board_id,
                conn = %connection_id,
                "ignoring undecodable ws message"
            ),
        }
    }

    let peers = {
        let mut board = board.write().await;
        board.peers.remove(&connection_id);
        board.peer_count()
    };
    info!(board_id = %board_id, conn = %connection_id, peers, "ws disconnected");
    if let Some(frame) = &close_frame {
        debug!(
            board_id = %board_id,
            conn = %connection_id,
            code = frame.code,
            reason = %frame.reason,
            "ws close frame"
        );
    }
    send_task.abort();

    broadcast_all(&board, ServerMessage::Peers { count: peers }).await;
    release_board(&state, &board_id, board).await;
}

async fn dispatch(board: &Arc<RwLock<Board>>, connection_id: Uuid, message: ClientMessage) {
    let result = {
        let mut board_guard = board.write().await;
        apply_client_message(&mut board_guard, connection_id, message)
    };
    if let Some((server_messages, include_sender)) = result {
        for server_message in server_messages {
            if include_sender {
                broadcast_all(board, server_message).await;
            } else {
                broadcast_except(board, connection_id, server_message).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_reports_healthy_without_a_body() {
        let response = ping_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
