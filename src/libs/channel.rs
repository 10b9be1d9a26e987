use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use anyhow::Ok as Okk;
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc::unbounded_channel;

use super::hub::HubHandle;
use super::message::{CHAT_MESSAGE, Frame};

/// Route of the websocket endpoint. `public/client.js` dials the same path.
pub const CHANNEL_PATH: &str = "/channel";

pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<HubHandle>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

pub async fn handle_socket(socket: WebSocket, hub: HubHandle) {
    let (tx, mut rx) = unbounded_channel::<Frame>();
    let id = match hub.connect(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("rejecting connection: {:#}", e);
            return;
        }
    };
    tracing::info!("client is connected: {}", &id);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = serde_json::to_string(&frame)?;
            // to ws client
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        Okk(())
    });

    let from = id.clone();
    let inbox = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match serde_json::from_str::<Frame>(text.as_str()) {
                Ok(frame) if frame.event == CHAT_MESSAGE => {
                    inbox.message(from.clone(), frame.data)?;
                }
                Ok(frame) => tracing::debug!("[ws] {} ignored event {:?}", &from, frame.event),
                Err(e) => tracing::debug!("[ws] {} sent a malformed frame: {}", &from, e),
            }
        }
        Okk(())
    });

    tokio::select! {
        _ = &mut recv_task => {}
        _ = &mut send_task => {}
    };

    // leave the active set before the socket is dropped
    hub.disconnect(id.clone());
    send_task.abort();
    recv_task.abort();
    tracing::info!("client is disconnected: {}", &id);
}
