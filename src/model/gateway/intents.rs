use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// A bitmask selecting which event categories the gateway will send.
    ///
    /// [Discord documentation](https://discord.com/developers/docs/events/gateway#gateway-intents)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GatewayIntents: u32 {
        /// Guild, channel, role, thread and stage-instance lifecycle events.
        const GUILDS = 1 << 0;
        /// Guild member add/update/remove events.
        ///
        /// **This intent is privileged.** - Your app requires approval from
        /// Discord to use this intent.
        const GUILD_MEMBERS = 1 << 1;
        /// Guild audit log entries and bans.
        const GUILD_MODERATION = 1 << 2;
        /// Guild emoji and sticker updates.
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        /// Guild integration updates.
        const GUILD_INTEGRATIONS = 1 << 4;
        /// Guild webhook updates.
        const GUILD_WEBHOOKS = 1 << 5;
        /// Guild invite create/delete events.
        const GUILD_INVITES = 1 << 6;
        /// Voice state updates.
        const GUILD_VOICE_STATES = 1 << 7;
        /// Presence updates.
        ///
        /// **This intent is privileged.** - Your app requires approval from
        /// Discord to use this intent.
        const GUILD_PRESENCES = 1 << 8;
        /// Messages sent in guild channels.
        const GUILD_MESSAGES = 1 << 9;
        /// Reactions on messages in guild channels.
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        /// Typing indicators in guild channels.
        const GUILD_MESSAGE_TYPING = 1 << 11;
        /// Messages sent in direct message channels.
        const DIRECT_MESSAGES = 1 << 12;
        /// Reactions on messages in direct message channels.
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        /// Typing indicators in direct message channels.
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        /// The contents of received messages.
        ///
        /// **This intent is privileged.** - Your app requires approval from
        /// Discord to use this intent.
        const MESSAGE_CONTENT = 1 << 15;
        /// Guild scheduled event lifecycle and subscription events.
        const GUILD_SCHEDULED_EVENTS = 1 << 16;
        /// Auto-moderation rule configuration events.
        const AUTO_MODERATION_CONFIGURATION = 1 << 20;
        /// Auto-moderation action execution events.
        const AUTO_MODERATION_EXECUTION = 1 << 21;
    }
}

impl Serialize for GatewayIntents {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl GatewayIntents {
    #[must_use]
    pub fn privileged() -> GatewayIntents {
        Self::GUILD_MEMBERS | Self::GUILD_PRESENCES | Self::MESSAGE_CONTENT
    }

    #[must_use]
    pub fn non_privileged() -> GatewayIntents {
        Self::privileged().complement()
    }
}

impl Default for GatewayIntents {
    fn default() -> Self {
        Self::non_privileged()
    }
}
