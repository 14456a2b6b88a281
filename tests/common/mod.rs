//! An in-process gateway for the end-to-end tests: a WebSocket server that
//! speaks the zlib-stream transport and lets a test script both sides of
//! the protocol.

use flate2::{Compress, Compression, FlushCompress};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame},
    tungstenite::Message,
    WebSocketStream,
};

pub struct MockGateway {
    listener: TcpListener,
    url: String,
}

impl MockGateway {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        Self { listener, url }
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Accept the next client connection. Each connection gets its own
    /// compression context, exactly like the real gateway.
    pub async fn accept(&self) -> MockConnection {
        let (stream, _) = self.listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();

        MockConnection {
            ws,
            zlib: Compress::new(Compression::default(), true),
        }
    }
}

pub struct MockConnection {
    ws: WebSocketStream<TcpStream>,
    zlib: Compress,
}

impl MockConnection {
    /// Send one envelope as a zlib-stream binary frame.
    pub async fn send_json(&mut self, value: &Value) {
        let frame = deflate(&mut self.zlib, &serde_json::to_vec(value).unwrap());
        self.ws.send(Message::Binary(frame)).await.unwrap();
    }

    /// Send one envelope split across two binary frames, the way large
    /// messages arrive from the real gateway.
    pub async fn send_json_fragmented(&mut self, value: &Value) {
        let frame = deflate(&mut self.zlib, &serde_json::to_vec(value).unwrap());
        let (first, second) = frame.split_at(frame.len() / 2);
        self.ws.send(Message::Binary(first.to_vec())).await.unwrap();
        self.ws.send(Message::Binary(second.to_vec())).await.unwrap();
    }

    /// Receive the next envelope sent by the client.
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let message = self
                .ws
                .next()
                .await
                .expect("client closed the connection")
                .unwrap();

            match message {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Ping(_) | Message::Pong(_) => {}
                other => panic!("unexpected message from client: {other:?}"),
            }
        }
    }

    /// Receive the next envelope, or `None` once the client goes away.
    pub async fn try_recv_json(&mut self) -> Option<Value> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    /// Expect the very next message to be a close frame and return its
    /// code. Any payload frame first is a test failure.
    pub async fn expect_close(&mut self) -> Option<u16> {
        loop {
            match self.ws.next().await {
                None => return None,
                Some(Err(_)) => return None,
                Some(Ok(Message::Close(frame))) => {
                    return frame.map(|frame| u16::from(frame.code))
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(other)) => panic!("expected a close frame, got: {other:?}"),
            }
        }
    }

    /// Read until the client's side of the close handshake, discarding
    /// anything else.
    pub async fn wait_close(&mut self) {
        while let Some(Ok(message)) = self.ws.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    }

    pub async fn send_close(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.ws.send(Message::Close(Some(frame))).await.unwrap();
    }

    pub async fn hello(&mut self, interval_ms: u64) {
        self.send_json(&json!({
            "op": 10,
            "d": {"heartbeat_interval": interval_ms},
            "s": null,
            "t": null
        }))
        .await;
    }

    pub async fn ready(&mut self, session_id: &str, resume_url: &str, seq: u64) {
        self.send_json(&json!({
            "op": 0,
            "d": {
                "v": 10,
                "user": {"id": "1", "username": "bot", "discriminator": "0"},
                "guilds": [],
                "session_id": session_id,
                "resume_gateway_url": resume_url,
                "application": {"id": "2"}
            },
            "s": seq,
            "t": "READY"
        }))
        .await;
    }

    pub async fn resumed(&mut self) {
        self.send_json(&json!({"op": 0, "d": null, "s": null, "t": "RESUMED"}))
            .await;
    }

    pub async fn ack(&mut self) {
        self.send_json(&json!({"op": 11, "d": null, "s": null, "t": null}))
            .await;
    }
}

/// Compress one message, ending on the sync flush marker. The shared
/// `compress` keeps the dictionary rolling across messages.
fn deflate(compress: &mut Compress, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 64);
    let before = compress.total_in();

    loop {
        let consumed = (compress.total_in() - before) as usize;
        compress
            .compress_vec(&data[consumed..], &mut out, FlushCompress::Sync)
            .unwrap();

        let consumed = (compress.total_in() - before) as usize;
        if consumed == data.len() && out.len() < out.capacity() {
            break;
        }

        out.reserve(64.max(out.capacity()));
    }

    out
}
