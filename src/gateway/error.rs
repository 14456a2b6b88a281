use std::{fmt::Display, time::Duration};

use tokio::time::Instant;

#[derive(Debug)]
pub enum Error {
    /// An operation that requires an open gateway connection was attempted
    /// without one.
    NotConnected,
    /// A resume was requested without resume credentials.
    NoSessionToResume,
    /// The gateway did not acknowledge the last heartbeat in time and no
    /// session credentials exist to resume with.
    AckMissing {
        /// When the unacknowledged heartbeat was sent.
        last_sent: Instant,
        /// The heartbeat interval negotiated in HELLO.
        interval: Duration,
    },
    /// The gateway closed the connection with a non-resumable close code.
    Closed {
        /// The close code sent by the gateway.
        code: u16,
        /// The close reason sent by the gateway, may be empty.
        reason: String,
    },
    /// The gateway sent a frame or payload outside the wire protocol.
    Protocol(String),
    /// An outbound payload exceeded the gateway's 4096-byte limit.
    PayloadTooLarge {
        /// The UTF-8 encoded length of the rejected payload.
        len: usize,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotConnected => write!(f, "Not connected to the gateway"),
            Error::NoSessionToResume => write!(f, "No session to resume"),
            Error::AckMissing { interval, .. } => write!(
                f,
                "No heartbeat ACK received within {interval:?} of the last heartbeat"
            ),
            Error::Closed { code, reason } => {
                if reason.is_empty() {
                    write!(f, "Gateway closed with code {code}")
                } else {
                    write!(f, "Gateway closed with code {code}: {reason}")
                }
            }
            Error::Protocol(detail) => write!(f, "Gateway protocol violation: {detail}"),
            Error::PayloadTooLarge { len } => {
                write!(f, "Payload of {len} bytes exceeds the 4096 byte limit")
            }
        }
    }
}

impl std::error::Error for Error {}
