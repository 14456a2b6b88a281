use crate::model::gateway::{intents::GatewayIntents, presence::PresenceUpdate};

/// Identify parameters and resume credentials for one gateway session.
///
/// Token and intents are fixed for the session's life; the presence may be
/// replaced at runtime. The resume credentials are populated by READY and
/// survive resumable disconnects.
#[derive(Debug)]
pub struct Session {
    pub(crate) token: String,
    pub(crate) intents: GatewayIntents,
    pub(crate) presence: Option<PresenceUpdate>,
    pub(crate) session_id: Option<String>,
    pub(crate) resume_gateway_url: Option<String>,
    pub(crate) sequence: Option<u64>,
}

impl Session {
    pub(crate) fn new(token: String, intents: GatewayIntents) -> Self {
        Self {
            token,
            intents,
            presence: None,
            session_id: None,
            resume_gateway_url: None,
            sequence: None,
        }
    }

    /// True once a READY event has populated the resume credentials.
    pub fn ready(&self) -> bool {
        self.session_id.is_some() && self.resume_gateway_url.is_some()
    }

    /// Drop the resume credentials. The session can only IDENTIFY afresh
    /// afterwards.
    pub(crate) fn clear(&mut self) {
        self.session_id = None;
        self.resume_gateway_url = None;
        self.sequence = None;
    }
}
