//! Types for the Discord gateway wire protocol: the event envelope, the
//! intent bitfield and the presence structures.

pub mod intents;
pub mod payload;
pub mod presence;

pub use intents::GatewayIntents;
pub use payload::{Dispatch, OpCode, Payload};
pub use presence::PresenceUpdate;
