use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::assets::assets_router;
use super::channel::{CHANNEL_PATH, ws_handler};
use super::hub::HubHandle;
use super::settings::Settings;

pub fn app(settings: &Settings, hub: HubHandle) -> Router {
    Router::new()
        .route(CHANNEL_PATH, get(ws_handler))
        .merge(assets_router(&settings.assets))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

pub async fn serve(settings: Settings) -> Result<()> {
    let hub = HubHandle::spawn();
    let app = app(&settings, hub);

    let addr = settings.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    tracing::info!("serving assets from {}", settings.assets.root.display());
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::settings::{Assets, Log, Server};
    use futures::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    fn settings(root: &std::path::Path) -> Settings {
        Settings {
            server: Server {
                host: "127.0.0.1".into(),
                port: 0,
            },
            assets: Assets {
                root: root.to_path_buf(),
                index: "index.html".into(),
            },
            log: Log {
                level: "debug".into(),
            },
        }
    }

    async fn start() -> (tempfile::TempDir, SocketAddr) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();
        let app = app(&settings(dir.path()), HubHandle::spawn());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        (dir, addr)
    }

    async fn next_frame(ws: &mut Client) -> Value {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                _ => continue,
            }
        }
    }

    /// Connects and waits for the hub to announce the new id.
    async fn join(addr: SocketAddr) -> (Client, String) {
        let (mut ws, _) = connect_async(format!("ws://{}{}", addr, CHANNEL_PATH)).await.unwrap();
        let hello = next_frame(&mut ws).await;
        assert_eq!(hello["event"], "connect");
        let id = hello["data"]["id"].as_str().unwrap().to_owned();
        (ws, id)
    }

    async fn say(ws: &mut Client, data: Value) {
        let frame = json!({"event": "chat message", "data": data}).to_string();
        ws.send(Message::Text(frame.into())).await.unwrap();
    }

    #[tokio::test]
    async fn both_clients_receive_stamped_message() {
        let (_dir, addr) = start().await;
        let (mut a, a_id) = join(addr).await;
        let (mut b, b_id) = join(addr).await;
        assert_ne!(a_id, b_id);

        say(&mut a, json!({"text": "hi"})).await;

        let expected = json!({"event": "chat message", "data": {"text": "hi", "id": a_id}});
        assert_eq!(next_frame(&mut a).await, expected);
        assert_eq!(next_frame(&mut b).await, expected);
    }

    #[tokio::test]
    async fn lone_client_hears_its_own_echo_in_order() {
        let (_dir, addr) = start().await;
        let (mut c, c_id) = join(addr).await;

        // noise that must not turn into broadcasts
        c.send(Message::Text("not json".to_owned().into())).await.unwrap();
        c.send(Message::Text(r#"{"event":"typing"}"#.to_owned().into())).await.unwrap();

        say(&mut c, json!({"text": "one"})).await;
        say(&mut c, json!({"text": "two"})).await;

        assert_eq!(next_frame(&mut c).await["data"], json!({"text": "one", "id": c_id}));
        assert_eq!(next_frame(&mut c).await["data"], json!({"text": "two", "id": c_id}));
    }

    #[tokio::test]
    async fn closed_client_is_left_out() {
        let (_dir, addr) = start().await;
        let (mut a, _) = join(addr).await;
        let (mut b, b_id) = join(addr).await;

        a.close(None).await.unwrap();
        // the server leaves the hub before dropping the socket, so once the
        // stream ends A is out of the active set
        loop {
            match a.next().await {
                None | Some(Err(_)) => break,
                Some(Ok(Message::Text(text))) => panic!("frame after close: {}", text.as_str()),
                Some(Ok(_)) => continue,
            }
        }

        say(&mut b, json!({"text": "anyone?"})).await;
        assert_eq!(next_frame(&mut b).await["data"], json!({"text": "anyone?", "id": b_id}));
    }

    #[tokio::test]
    async fn http_surface_shares_the_listener() {
        let (_dir, addr) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /missing.js HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).await.unwrap();
        assert!(buf.starts_with("HTTP/1.1 404"), "{}", buf);
    }
}
