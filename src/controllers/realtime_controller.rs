use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::time::{interval, Duration};

use crate::{services::sessions::SessionHandle, AppState};

#[derive(Debug, Deserialize)]
#[serde(tag = "event")]
pub enum ClientMessage {
    #[serde(rename = "registerUser")]
    RegisterUser { token: String },
}

// GET /ws
pub async fn ws_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_updates_socket(socket, state))
}

fn handle_client_text(state: &AppState, handle: &SessionHandle, txt: &str) {
    match serde_json::from_str::<ClientMessage>(txt) {
        Ok(ClientMessage::RegisterUser { token }) => {
            // bad tokens are dropped without telling the client
            match state
                .sessions
                .register_with_token(&state.identity, &token, handle.clone())
            {
                Some(owner) => tracing::debug!("live session {:?} bound to {}", handle.id(), owner),
                None => tracing::debug!("live session {:?}: rejected token", handle.id()),
            }
        }
        Err(_) => tracing::debug!("live session {:?}: ignoring message", handle.id()),
    }
}

async fn handle_updates_socket(mut socket: WebSocket, state: AppState) {
    let (handle, mut outbox) = state.sessions.open_connection();
    tracing::info!("WS client connected: {:?}", handle.id());

    // Ping browser to keep alive
    let mut ping = interval(Duration::from_secs(25));

    loop {
        tokio::select! {
            _ = ping.tick() => {
                if socket.send(Message::Ping(b"ping".to_vec())).await.is_err() {
                    break;
                }
            }

            out = outbox.recv() => {
                let Some(payload) = out else { break };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }

            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Text(txt))) => handle_client_text(&state, &handle, &txt),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let owners = state.sessions.unregister(handle.id());
    tracing::info!("WS client disconnected: {:?} ({} binding(s) dropped)", handle.id(), owners.len());

    let _ = socket.close().await;
}
