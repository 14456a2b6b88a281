use std::time::Duration;

use futures::{stream::FusedStream, SinkExt, StreamExt};
use serde_json::to_string;
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{
        client::IntoClientRequest,
        http::{header, HeaderValue},
        protocol::{frame::coding::CloseCode, CloseFrame, WebSocketConfig},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};

use crate::{
    error::Result,
    model::gateway::{
        intents::GatewayIntents,
        payload::{Identify, IdentifyProperties, OpCode, Payload, Resume},
        presence::PresenceUpdate,
    },
};

use super::{error::Error as GatewayError, inflater::Inflater};

/// The gateway rejects any payload larger than this, so oversized sends are
/// refused locally before touching the socket.
pub(crate) const MAX_PAYLOAD_LEN: usize = 4096;

/// One logical message read from the socket.
#[derive(Debug)]
pub(crate) enum Received {
    /// A complete, inflated and decoded envelope.
    Payload(Payload),
    /// The gateway closed the connection, decoded to close code and reason
    /// text. `None` means the socket went away without a close frame.
    Close(Option<(u16, String)>),
}

/// A WebSocket connection paired with its inflate context.
///
/// The two are created together and destroyed together: the zlib stream
/// spans exactly one socket, so reusing a context across sockets (or
/// recreating one mid-socket) desynchronizes the dictionary.
#[derive(Debug)]
pub(crate) struct WebsocketClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    inflater: Inflater,
}

impl WebsocketClient {
    pub async fn connect(url: &str, user_agent: &str) -> Result<Self> {
        let config = WebSocketConfig::default();

        let mut request = url.into_client_request()?;
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|_| GatewayError::Protocol("user agent is not a valid header".to_string()))?;
        request.headers_mut().insert(header::USER_AGENT, user_agent);

        let (stream, _) = connect_async_with_config(request, Some(config), false).await?;

        Ok(Self {
            stream,
            inflater: Inflater::new(),
        })
    }

    /// Read one logical message, waiting at most `deadline`.
    ///
    /// `Ok(None)` means the deadline elapsed, a partial zlib fragment
    /// arrived, or a control frame was absorbed; the caller treats all of
    /// these as a heartbeat tick.
    pub async fn receive(&mut self, deadline: Duration) -> Result<Option<Received>> {
        if self.stream.is_terminated() {
            return Ok(Some(Received::Close(None)));
        }

        let message = match timeout(deadline, self.stream.next()).await {
            Ok(Some(Ok(message))) => message,
            Ok(Some(Err(err))) => return Err(err)?,
            Ok(None) => return Ok(Some(Received::Close(None))),
            Err(_) => return Ok(None),
        };

        match message {
            Message::Binary(bytes) => {
                self.inflater.extend(&bytes);
                let Some(inflated) = self.inflater.message()? else {
                    return Ok(None);
                };
                let payload = serde_json::from_slice(&inflated)
                    .map_err(|err| GatewayError::Protocol(err.to_string()))?;
                Ok(Some(Received::Payload(payload)))
            }
            Message::Close(frame) => Ok(Some(Received::Close(frame.map(|frame| {
                (u16::from(frame.code), frame.reason.into_owned())
            })))),
            Message::Text(_) => {
                return Err(GatewayError::Protocol(
                    "received a text frame on a zlib-stream connection".to_string(),
                ))?
            }
            _ => Ok(None),
        }
    }

    pub async fn send(&mut self, payload: &Payload) -> Result<()> {
        let message = encode(payload)?;
        self.stream.send(Message::Text(message)).await?;
        Ok(())
    }

    pub async fn send_heartbeat(&mut self, sequence: Option<u64>) -> Result<()> {
        self.send(&Payload::heartbeat(sequence)).await
    }

    pub async fn send_identify(
        &mut self,
        token: &str,
        intents: GatewayIntents,
        presence: Option<&PresenceUpdate>,
    ) -> Result<()> {
        let identify = Identify {
            token: token.to_string(),
            properties: IdentifyProperties::default(),
            intents,
            presence: presence.cloned(),
        };

        self.send(&Payload::command(
            OpCode::Identify,
            serde_json::to_value(identify)?,
        ))
        .await
    }

    pub async fn send_resume(
        &mut self,
        token: &str,
        session_id: &str,
        sequence: Option<u64>,
    ) -> Result<()> {
        let resume = Resume {
            token: token.to_string(),
            session_id: session_id.to_string(),
            sequence,
        };

        self.send(&Payload::command(
            OpCode::Resume,
            serde_json::to_value(resume)?,
        ))
        .await
    }

    pub async fn send_presence(&mut self, presence: &PresenceUpdate) -> Result<()> {
        self.send(&Payload::command(
            OpCode::PresenceUpdate,
            serde_json::to_value(presence)?,
        ))
        .await
    }

    /// Send a close frame. Failures are ignored, the peer may already be
    /// gone.
    pub async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        let _ = self.stream.close(Some(frame)).await;
    }
}

/// Serialize an envelope, enforcing the outbound size limit.
pub(crate) fn encode(payload: &Payload) -> Result<String> {
    let encoded = to_string(payload)?;

    if encoded.len() > MAX_PAYLOAD_LEN {
        return Err(GatewayError::PayloadTooLarge { len: encoded.len() })?;
    }

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::{encode, MAX_PAYLOAD_LEN};
    use crate::{
        error::Error,
        gateway::error::Error as GatewayError,
        model::gateway::payload::{OpCode, Payload},
    };
    use serde_json::json;

    #[test]
    fn small_payloads_pass_the_guard() {
        let encoded = encode(&Payload::heartbeat(Some(41))).unwrap();
        assert!(encoded.len() <= MAX_PAYLOAD_LEN);
    }

    #[test]
    fn oversized_payloads_are_rejected_locally() {
        let payload = Payload::command(
            OpCode::PresenceUpdate,
            json!({"state": "x".repeat(MAX_PAYLOAD_LEN)}),
        );

        match encode(&payload) {
            Err(Error::Gateway(GatewayError::PayloadTooLarge { len })) => {
                assert!(len > MAX_PAYLOAD_LEN);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }
}
