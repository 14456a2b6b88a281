//! The gateway session engine.
//!
//! One [`Gateway`] drives one connection as a single logical task: there is
//! no background timer, the bounded read deadline doubles as the heartbeat
//! tick. Control frames (HELLO, heartbeats, RECONNECT, INVALID_SESSION,
//! resumable closes) are handled internally; the caller only ever sees
//! dispatch events, in the order the server sent them.

use std::{sync::OnceLock, time::Duration};

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    error::Result,
    model::gateway::{
        intents::GatewayIntents,
        payload::{Dispatch, Hello, OpCode, Payload, Ready},
        presence::PresenceUpdate,
    },
    rest::Rest,
};

use super::{
    error::Error as GatewayError,
    heartbeat::Heartbeater,
    session::Session,
    socket::{Received, WebsocketClient},
    GATEWAY_VERSION,
};

/// Gateway URL discovered over REST, shared by every session in the
/// process. Filled on first use, never invalidated by the engine.
static GATEWAY_URL: OnceLock<String> = OnceLock::new();

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// The connection stage of a [`Gateway`].
pub enum ConnectionStage {
    /// No socket is open.
    Disconnected,
    /// Socket open, awaiting HELLO.
    Connecting,
    /// IDENTIFY sent, awaiting READY.
    Identifying,
    /// READY or RESUMED received, dispatches flow.
    Connected,
    /// RESUME sent on a fresh socket, awaiting server catch-up.
    Resuming,
}

/// A client connection to the Discord gateway.
///
/// ```no_run
/// use cordwire::gateway::Gateway;
/// use cordwire::model::gateway::GatewayIntents;
///
/// # async fn run() -> cordwire::error::Result<()> {
/// let mut gateway = Gateway::new("token", GatewayIntents::non_privileged());
/// gateway.connect().await?;
///
/// while let Some(dispatch) = gateway.next_event().await? {
///     println!("{}: {}", dispatch.event, dispatch.data);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Gateway {
    session: Session,
    heartbeat: Heartbeater,
    socket: Option<WebsocketClient>,
    stage: ConnectionStage,
    timeout: Duration,
    user_agent: String,
    gateway_url: Option<String>,
}

impl Gateway {
    #[must_use]
    pub fn new(token: impl Into<String>, intents: GatewayIntents) -> Self {
        Self {
            session: Session::new(token.into(), intents),
            heartbeat: Heartbeater::new(),
            socket: None,
            stage: ConnectionStage::Disconnected,
            timeout: DEFAULT_TIMEOUT,
            user_agent: crate::USER_AGENT.to_string(),
            gateway_url: None,
        }
    }

    /// The presence sent with IDENTIFY.
    #[must_use]
    pub fn presence(mut self, presence: PresenceUpdate) -> Self {
        self.session.presence = Some(presence);
        self
    }

    /// The socket read deadline, which is also the heartbeat tick. Should
    /// stay well below half the smallest heartbeat interval the gateway
    /// hands out.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The User-Agent presented on gateway and REST connections.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Connect to this URL instead of discovering one over REST.
    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Open the connection. Resumes the previous session when resume
    /// credentials exist, identifies afresh otherwise. A no-op when a
    /// socket is already open.
    pub async fn connect(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }

        if self.session.ready() {
            self.resume().await
        } else {
            self.fresh_connect().await
        }
    }

    /// The next dispatch event, in server order.
    ///
    /// Internally loops over any number of control frames and recoverable
    /// disconnects. Returns `Ok(None)` once the session is over: after a
    /// caller-initiated [`close`](Self::close), or after a clean close by
    /// the server.
    pub async fn next_event(&mut self) -> Result<Option<Dispatch>> {
        loop {
            if self.socket.is_none() {
                return Ok(None);
            }

            self.heartbeat_check().await?;

            let Some(socket) = self.socket.as_mut() else {
                return Ok(None);
            };

            match socket.receive(self.timeout).await? {
                // Deadline elapsed or partial frame: loop back through the
                // heartbeat check.
                None => {}
                Some(Received::Close(frame)) => self.handle_close(frame).await?,
                Some(Received::Payload(payload)) => {
                    if let Some(dispatch) = self.handle_payload(payload).await? {
                        return Ok(Some(dispatch));
                    }
                }
            }
        }
    }

    /// Replace the presence. The new value rides every future IDENTIFY and
    /// is pushed to the gateway immediately; when no socket is open the
    /// update is stored but the call fails with `NotConnected`.
    pub async fn set_presence(&mut self, presence: PresenceUpdate) -> Result<()> {
        self.session.presence = Some(presence.clone());

        let Some(socket) = self.socket.as_mut() else {
            return Err(GatewayError::NotConnected)?;
        };

        socket.send_presence(&presence).await
    }

    /// Close the connection with status 1000 and drop the session state.
    pub async fn close(&mut self) {
        self.close_with(1000).await;
    }

    pub fn connected(&self) -> bool {
        self.socket.is_some()
    }

    /// True once READY populated the resume credentials.
    pub fn ready(&self) -> bool {
        self.session.ready()
    }

    pub fn stage(&self) -> ConnectionStage {
        self.stage
    }

    /// The last sequence number observed from the server.
    pub fn sequence(&self) -> Option<u64> {
        self.session.sequence
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.session_id.as_deref()
    }

    /// Time between the last heartbeat and its acknowledgement.
    pub fn latency(&self) -> Option<Duration> {
        self.heartbeat.latency()
    }

    /// Open a socket to the configured or discovered gateway URL.
    async fn fresh_connect(&mut self) -> Result<()> {
        if self.socket.is_some() {
            warn!("an active gateway connection already exists, closing it");
            self.close_with(1000).await;
        }

        let url = match &self.gateway_url {
            Some(url) => url.clone(),
            None => discover_gateway_url(&self.user_agent).await?,
        };

        let socket = WebsocketClient::connect(&connection_url(&url), &self.user_agent).await?;
        info!("gateway connection created");
        self.socket = Some(socket);
        self.stage = ConnectionStage::Connecting;

        Ok(())
    }

    /// Open a socket to the resume URL and replay the session.
    ///
    /// RESUME goes out as soon as the socket opens; the HELLO that follows
    /// only re-arms the heartbeat schedule.
    async fn resume(&mut self) -> Result<()> {
        let (Some(session_id), Some(url)) = (
            self.session.session_id.clone(),
            self.session.resume_gateway_url.clone(),
        ) else {
            return Err(GatewayError::NoSessionToResume)?;
        };

        let mut socket = WebsocketClient::connect(&connection_url(&url), &self.user_agent).await?;
        info!("sending resume payload");
        socket
            .send_resume(&self.session.token, &session_id, self.session.sequence)
            .await?;
        self.socket = Some(socket);
        self.stage = ConnectionStage::Resuming;

        Ok(())
    }

    async fn identify(&mut self) -> Result<()> {
        let token = self.session.token.clone();
        let intents = self.session.intents;
        let presence = self.session.presence.clone();

        let Some(socket) = self.socket.as_mut() else {
            return Err(GatewayError::NotConnected)?;
        };

        info!("sending identify payload");
        socket.send_identify(&token, intents, presence.as_ref()).await?;
        self.stage = ConnectionStage::Identifying;

        Ok(())
    }

    async fn beat(&mut self) -> Result<()> {
        let sequence = self.session.sequence;

        let Some(socket) = self.socket.as_mut() else {
            return Err(GatewayError::NotConnected)?;
        };

        debug!(sequence, "sending heartbeat payload");
        socket.send_heartbeat(sequence).await?;
        self.heartbeat.record_send(Instant::now());

        Ok(())
    }

    /// Evaluate the heartbeat schedule against the current clock. Runs on
    /// every receive iteration, including read timeouts.
    async fn heartbeat_check(&mut self) -> Result<()> {
        let now = Instant::now();

        if self.heartbeat.first_beat_due(now) {
            return self.beat().await;
        }

        if !self.heartbeat.next_beat_due(now) {
            return Ok(());
        }

        if !self.heartbeat.ack_missing(now) {
            return self.beat().await;
        }

        warn!("no heartbeat ACK from the gateway for the last heartbeat, aborting connection");
        let last_sent = self.heartbeat.last_sent().unwrap_or(now);
        let interval = self.heartbeat.interval().unwrap_or_default();
        self.close_with(1011).await;

        if !self.session.ready() {
            return Err(GatewayError::AckMissing {
                last_sent,
                interval,
            })?;
        }

        self.resume().await
    }

    async fn handle_close(&mut self, frame: Option<(u16, String)>) -> Result<()> {
        let Some((code, reason)) = frame else {
            // The socket went away without a close frame. Treat it as
            // abnormal and try to pick the session back up.
            warn!("gateway connection dropped without a close frame");
            self.close_with(1011).await;
            return if self.session.ready() {
                self.resume().await
            } else {
                self.fresh_connect().await
            };
        };

        if code == 1000 || code == 1001 {
            info!(code, "gateway closed the connection cleanly");
            self.close_with(1000).await;
            return Ok(());
        }

        if !resumable_close(code) {
            error!(code, reason = %reason, "gateway closed the connection");
            // Drop the credentials so a later connect() cannot silently
            // resume a session the server refused.
            self.close_with(1000).await;
            return Err(GatewayError::Closed { code, reason })?;
        }

        warn!(code, reason = %reason, "gateway closed the connection, recovering");
        if self.session.ready() {
            self.close_with(1011).await;
            self.resume().await
        } else {
            self.close_with(1000).await;
            self.fresh_connect().await
        }
    }

    /// Apply one envelope. Returns the dispatch to surface, if any.
    async fn handle_payload(&mut self, payload: Payload) -> Result<Option<Dispatch>> {
        // The sequence rides heartbeats and resumes, so track it from every
        // envelope that carries one, not only dispatches.
        if payload.s.is_some() {
            self.session.sequence = payload.s;
        }

        match payload.op {
            OpCode::Dispatch => {
                let Some(event) = payload.t else {
                    return Err(GatewayError::Protocol(
                        "dispatch without an event name".to_string(),
                    ))?;
                };
                let data = payload.d.unwrap_or(Value::Null);

                match event.as_str() {
                    "READY" => {
                        let ready: Ready = serde_json::from_value(data.clone())
                            .map_err(|err| GatewayError::Protocol(err.to_string()))?;
                        info!(session_id = %ready.session_id, "gateway session is ready");
                        self.session.session_id = Some(ready.session_id);
                        self.session.resume_gateway_url = Some(ready.resume_gateway_url);
                        self.stage = ConnectionStage::Connected;
                    }
                    "RESUMED" => {
                        info!("gateway session resumed");
                        self.stage = ConnectionStage::Connected;
                    }
                    _ => {}
                }

                Ok(Some(Dispatch { event, data }))
            }
            OpCode::Heartbeat => {
                // The gateway wants a beat now, ahead of schedule.
                self.beat().await?;
                Ok(None)
            }
            OpCode::Reconnect => {
                info!("gateway requested a reconnect");
                if self.session.ready() {
                    self.close_with(1011).await;
                    self.resume().await?;
                } else {
                    self.close_with(1000).await;
                    self.fresh_connect().await?;
                }
                Ok(None)
            }
            OpCode::InvalidSession => {
                // A rejected resume always starts over; a live session may
                // resume when the payload says so.
                let resumable = self.stage != ConnectionStage::Resuming
                    && payload.d.as_ref().and_then(Value::as_bool) == Some(true)
                    && self.session.ready();
                warn!(resumable, "gateway invalidated the session");
                if resumable {
                    self.close_with(1011).await;
                    self.resume().await?;
                } else {
                    self.close_with(1000).await;
                    self.fresh_connect().await?;
                }
                Ok(None)
            }
            OpCode::Hello => {
                let Some(d) = payload.d else {
                    return Err(GatewayError::Protocol("HELLO without data".to_string()))?;
                };
                let hello: Hello = serde_json::from_value(d)
                    .map_err(|err| GatewayError::Protocol(err.to_string()))?;
                debug!(interval_ms = hello.heartbeat_interval, "gateway sent HELLO");
                self.heartbeat.hello(
                    Instant::now(),
                    Duration::from_millis(hello.heartbeat_interval),
                );

                // A session that never reached READY identifies here; a
                // resume is already in flight otherwise.
                if !self.session.ready() {
                    self.identify().await?;
                }
                Ok(None)
            }
            OpCode::HeartbeatACK => {
                self.heartbeat.record_ack(Instant::now());
                if let Some(latency) = self.heartbeat.latency() {
                    debug!(latency_ms = latency.as_millis() as u64, "gateway ACK heartbeat");
                }
                Ok(None)
            }
            op => {
                return Err(GatewayError::Protocol(format!(
                    "received send-only opcode {op:?}"
                )))?
            }
        }
    }

    /// Close the socket. Status 1000/1001 also drops the resume
    /// credentials; any other status preserves them for a resume.
    async fn close_with(&mut self, code: u16) {
        if let Some(mut socket) = self.socket.take() {
            socket.close(code).await;
        }

        if code == 1000 || code == 1001 {
            self.session.clear();
        }

        self.heartbeat.reset();
        self.stage = ConnectionStage::Disconnected;
    }
}

fn connection_url(base: &str) -> String {
    format!("{base}?v={GATEWAY_VERSION}&encoding=json&compress=zlib-stream")
}

/// Fetch the gateway URL through the REST collaborator, memoized for the
/// life of the process.
async fn discover_gateway_url(user_agent: &str) -> Result<String> {
    if let Some(url) = GATEWAY_URL.get() {
        return Ok(url.clone());
    }

    info!("gateway URL not cached, requesting it from the REST API");
    let gateway = Rest::new(Some(user_agent))?.get_gateway().await?;
    info!(url = %gateway.url, "gateway URL discovered");

    Ok(GATEWAY_URL.get_or_init(|| gateway.url).clone())
}

/// Whether a server close code leaves the session resumable.
///
/// Anything outside the table is fatal, which errs on the side of
/// surfacing unknown codes instead of reconnecting forever.
///
/// [Discord documentation](https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-close-event-codes)
pub(crate) fn resumable_close(code: u16) -> bool {
    matches!(code, 4000..=4003 | 4005 | 4007..=4009)
}

#[cfg(test)]
mod tests {
    use super::{connection_url, resumable_close};

    #[test]
    fn close_code_classification() {
        for code in [4000, 4001, 4002, 4003, 4005, 4007, 4008, 4009] {
            assert!(resumable_close(code), "{code} should be resumable");
        }

        // Authentication, sharding and intent failures end the session.
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(!resumable_close(code), "{code} should be fatal");
        }

        // Unknown codes default to fatal.
        assert!(!resumable_close(4042));
        assert!(!resumable_close(1006));
    }

    #[test]
    fn connection_url_carries_the_transport_query() {
        assert_eq!(
            connection_url("wss://gateway.discord.gg"),
            "wss://gateway.discord.gg?v=10&encoding=json&compress=zlib-stream"
        );
    }
}
