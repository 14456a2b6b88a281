//! The gateway event envelope and the payloads the client sends during the
//! connection handshake.
//!
//! Dispatch event bodies are deliberately left as [`serde_json::Value`]: the
//! gateway engine only routes them, it never interprets them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{intents::GatewayIntents, presence::PresenceUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
#[serde(into = "u8", try_from = "u8")]
#[non_exhaustive]
/// Used to identify the type of event sent and received by the gateway.
///
/// [Discord documentation](https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-opcodes)
pub enum OpCode {
    /// **Receive** only
    ///
    /// An event was dispatched. The event name is carried in the envelope's
    /// `t` field and the body in `d`.
    Dispatch = 0,
    /// **Send/Receive**
    ///
    /// Fired periodically by the client to keep the connection alive.
    /// Can be received from the gateway to request an immediate heartbeat.
    Heartbeat = 1,
    /// **Send**
    ///
    /// Starts a new session during the initial handshake.
    Identify = 2,
    /// **Send**
    ///
    /// Update the client's presence.
    PresenceUpdate = 3,
    /// **Send**
    ///
    /// Used to join/leave or move between voice channels.
    VoiceStateUpdate = 4,
    /// **Send**
    ///
    /// Resume a previous session that was disconnected.
    Resume = 6,
    /// **Receive**
    ///
    /// The client should attempt to reconnect and resume immediately.
    Reconnect = 7,
    /// **Send**
    ///
    /// Request information about offline guild members in a large guild.
    RequestGuildMembers = 8,
    /// **Receive**
    ///
    /// The session has been invalidated. The client should reconnect and
    /// identify/resume accordingly.
    InvalidSession = 9,
    /// **Receive**
    ///
    /// Received immediately after connecting, contains the
    /// `heartbeat_interval` to use.
    Hello = 10,
    /// **Receive**
    ///
    /// Received in response to sending a heartbeat, the gateway acknowledges
    /// the heartbeat.
    HeartbeatACK = 11,
}

impl From<OpCode> for u8 {
    fn from(value: OpCode) -> Self {
        value as u8
    }
}

#[derive(Debug)]
/// Decode failure for an opcode outside the documented table.
pub struct UnknownOpCode(pub u8);

impl std::fmt::Display for UnknownOpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown gateway opcode {}", self.0)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => OpCode::Dispatch,
            1 => OpCode::Heartbeat,
            2 => OpCode::Identify,
            3 => OpCode::PresenceUpdate,
            4 => OpCode::VoiceStateUpdate,
            6 => OpCode::Resume,
            7 => OpCode::Reconnect,
            8 => OpCode::RequestGuildMembers,
            9 => OpCode::InvalidSession,
            10 => OpCode::Hello,
            11 => OpCode::HeartbeatACK,
            _ => return Err(UnknownOpCode(value)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
/// The envelope every gateway message travels in.
///
/// All four keys are always present on the wire; `d`, `s` and `t` may be
/// null.
///
/// [Discord documentation](https://discord.com/developers/docs/topics/gateway-events#payload-structure)
pub struct Payload {
    /// The opcode of the event.
    pub op: OpCode,
    #[serde(default)]
    /// The data of the event. Opaque to the engine for dispatches.
    pub d: Option<Value>,
    #[serde(default)]
    /// The sequence number of the event, set on dispatches only.
    pub s: Option<u64>,
    #[serde(default)]
    /// The dispatch event name, set on dispatches only.
    pub t: Option<String>,
}

impl Payload {
    /// An outbound command envelope carrying `d`.
    pub(crate) fn command(op: OpCode, d: Value) -> Self {
        Self {
            op,
            d: Some(d),
            s: None,
            t: None,
        }
    }

    /// A heartbeat envelope carrying the last observed sequence.
    pub(crate) fn heartbeat(sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat,
            d: sequence.map(Value::from),
            s: None,
            t: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
/// `d` of a HELLO envelope.
pub struct Hello {
    /// The interval in milliseconds at which the client should send
    /// heartbeats.
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
/// The subset of the READY event the engine consumes. The full body is
/// still surfaced to the caller untouched.
///
/// [Discord documentation](https://discord.com/developers/docs/events/gateway-events#ready)
pub struct Ready {
    /// Given back to the gateway when resuming a session.
    pub session_id: String,
    /// The URL to reconnect to when resuming the session.
    pub resume_gateway_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
/// Connection properties sent with [`Identify`].
///
/// [Discord documentation](https://discord.com/developers/docs/events/gateway#identifying)
pub struct IdentifyProperties {
    os: String,
    browser: String,
    device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "cordwire".to_string(),
            device: "cordwire".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
/// `d` of an IDENTIFY envelope.
///
/// [Discord documentation](https://discord.com/developers/docs/topics/gateway-events#identify)
pub struct Identify {
    /// The token of the bot that the client is connecting with.
    pub token: String,
    /// The properties of the client.
    pub properties: IdentifyProperties,
    /// The intents of the client.
    pub intents: GatewayIntents,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// The initial presence of the client.
    pub presence: Option<PresenceUpdate>,
}

#[derive(Debug, Clone, Serialize)]
/// `d` of a RESUME envelope.
///
/// [Discord documentation](https://discord.com/developers/docs/topics/gateway-events#resume)
pub struct Resume {
    /// The token the client identified with.
    pub token: String,
    /// The session ID received in the READY event.
    pub session_id: String,
    #[serde(rename = "seq")]
    /// The last sequence number observed by the client, null if none was.
    pub sequence: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
/// A dispatch event surfaced to the caller: the event name together with
/// its unparsed body.
pub struct Dispatch {
    /// The dispatch event name, e.g. `MESSAGE_CREATE`.
    pub event: String,
    /// The event body. `Value::Null` when the gateway sent no data.
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::{Hello, OpCode, Payload, Ready, Resume};
    use serde_json::{from_str, json, to_string, to_value};

    #[test]
    fn envelope_round_trip() {
        let payload: Payload =
            from_str(r#"{"op":10,"d":{"heartbeat_interval":45000},"s":null,"t":null}"#).unwrap();
        assert_eq!(payload.op, OpCode::Hello);
        assert_eq!(payload.s, None);
        assert_eq!(payload.t, None);

        let hello: Hello = serde_json::from_value(payload.d.unwrap()).unwrap();
        assert_eq!(hello.heartbeat_interval, 45000);
    }

    #[test]
    fn dispatch_envelope_keeps_sequence_and_name() {
        let payload: Payload =
            from_str(r#"{"op":0,"d":{"content":"hi"},"s":42,"t":"MESSAGE_CREATE"}"#).unwrap();
        assert_eq!(payload.op, OpCode::Dispatch);
        assert_eq!(payload.s, Some(42));
        assert_eq!(payload.t.as_deref(), Some("MESSAGE_CREATE"));
    }

    #[test]
    fn unknown_opcode_is_a_decode_error() {
        assert!(from_str::<Payload>(r#"{"op":5,"d":null,"s":null,"t":null}"#).is_err());
        assert!(from_str::<Payload>(r#"{"op":12,"d":null,"s":null,"t":null}"#).is_err());
    }

    #[test]
    fn heartbeat_serializes_all_keys() {
        let beat = to_value(Payload::heartbeat(Some(7))).unwrap();
        assert_eq!(beat, json!({"op": 1, "d": 7, "s": null, "t": null}));

        let first = to_string(&Payload::heartbeat(None)).unwrap();
        assert!(first.contains(r#""d":null"#));
    }

    #[test]
    fn ready_ignores_unknown_fields() {
        let ready: Ready = serde_json::from_value(json!({
            "v": 10,
            "user": {"id": "1"},
            "guilds": [],
            "session_id": "SID",
            "resume_gateway_url": "wss://resume.example",
            "application": {}
        }))
        .unwrap();
        assert_eq!(ready.session_id, "SID");
        assert_eq!(ready.resume_gateway_url, "wss://resume.example");
    }

    #[test]
    fn resume_renames_sequence() {
        let resume = to_value(Resume {
            token: "t".to_string(),
            session_id: "SID".to_string(),
            sequence: Some(2),
        })
        .unwrap();
        assert_eq!(
            resume,
            json!({"token": "t", "session_id": "SID", "seq": 2})
        );
    }
}
