//! Presence structures sent with IDENTIFY and PRESENCE_UPDATE envelopes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
/// `d` of a PRESENCE_UPDATE envelope, also embedded in IDENTIFY.
///
/// [Discord documentation](https://discord.com/developers/docs/topics/gateway-events#update-presence)
pub struct PresenceUpdate {
    /// Unix time in milliseconds of when the client went idle, null if the
    /// client is not idle.
    pub since: Option<u64>,
    /// The client's activities.
    pub activities: Vec<Activity>,
    /// The client's new status.
    pub status: Status,
    /// Whether or not the client is AFK.
    pub afk: bool,
}

impl PresenceUpdate {
    /// A presence with the given status and no activity.
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            since: None,
            activities: Vec::new(),
            status,
            afk: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
/// An activity shown on the client's profile.
///
/// [Discord documentation](https://discord.com/developers/docs/topics/gateway-events#activity-object)
pub struct Activity {
    /// The activity's name.
    pub name: String,
    #[serde(rename = "type")]
    /// The activity type.
    pub kind: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Stream URL, validated when the type is [`ActivityType::Streaming`].
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// The user's current party status, or the text of a custom status.
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
#[serde(into = "u8", try_from = "u8")]
/// The type of an [`Activity`].
pub enum ActivityType {
    Game = 0,
    Streaming = 1,
    Listening = 2,
    Watching = 3,
    Custom = 4,
    Competing = 5,
}

impl From<ActivityType> for u8 {
    fn from(value: ActivityType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for ActivityType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ActivityType::Game,
            1 => ActivityType::Streaming,
            2 => ActivityType::Listening,
            3 => ActivityType::Watching,
            4 => ActivityType::Custom,
            5 => ActivityType::Competing,
            _ => return Err(format!("unknown activity type {value}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
/// The client's online status.
pub enum Status {
    Online,
    Dnd,
    Idle,
    Invisible,
    Offline,
}
