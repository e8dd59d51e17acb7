//! Platform model: the bot's in-memory view of the chat platform.
//!
//! The platform gateway (out of scope here) keeps the [`Directory`] current
//! and delivers [`Event`]s over an mpsc channel. The core only ever reads
//! this view; it never talks to the network itself.

use dashmap::DashMap;
use std::collections::HashSet;

pub type UserId = i64;
pub type GuildId = i64;
pub type ChannelId = i64;
pub type MessageId = i64;

/// What kind of conversation a channel is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// A shared text channel inside a guild.
    Text,
    /// A one-to-one private conversation.
    Private,
    /// A multi-party private conversation with an owner.
    Group,
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub guild: Option<GuildId>,
    /// Direct participants of a private or group conversation.
    pub recipients: Vec<UserId>,
    /// Owner of a group conversation.
    pub owner: Option<UserId>,
    /// Members the platform grants management capability here.
    pub managers: HashSet<UserId>,
}

impl Channel {
    pub fn text(id: ChannelId, guild: GuildId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ChannelKind::Text,
            guild: Some(guild),
            recipients: Vec::new(),
            owner: None,
            managers: HashSet::new(),
        }
    }

    pub fn private(id: ChannelId, recipients: Vec<UserId>) -> Self {
        Self {
            id,
            name: String::new(),
            kind: ChannelKind::Private,
            guild: None,
            recipients,
            owner: None,
            managers: HashSet::new(),
        }
    }

    pub fn group(id: ChannelId, owner: UserId, recipients: Vec<UserId>) -> Self {
        Self {
            id,
            name: String::new(),
            kind: ChannelKind::Group,
            guild: None,
            recipients,
            owner: Some(owner),
            managers: HashSet::new(),
        }
    }

    pub fn with_manager(mut self, user: UserId) -> Self {
        self.managers.insert(user);
        self
    }

    pub fn is_private(&self) -> bool {
        matches!(self.kind, ChannelKind::Private | ChannelKind::Group)
    }
}

#[derive(Debug, Clone)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub owner: UserId,
    pub members: HashSet<UserId>,
}

impl Guild {
    pub fn new(id: GuildId, name: impl Into<String>, owner: UserId) -> Self {
        let mut members = HashSet::new();
        members.insert(owner);
        Self {
            id,
            name: name.into(),
            owner,
            members,
        }
    }

    pub fn with_member(mut self, user: UserId) -> Self {
        self.members.insert(user);
        self
    }
}

/// A user as the platform sees them.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub bot: bool,
}

impl Profile {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }
}

/// One inbound chat message.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub author: UserId,
    pub channel: ChannelId,
    pub content: String,
}

/// A location a privilege level is resolved against: one channel, or a whole
/// guild as an aggregate of its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Channel(ChannelId),
    Guild(GuildId),
}

/// A reply queued for delivery by the platform gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub channel: ChannelId,
    pub text: String,
}

/// Inbound platform events, delivered in per-channel order.
#[derive(Debug, Clone)]
pub enum Event {
    Ready,
    Message(Message),
    ReactionAdd {
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: String,
    },
    ReactionRemove {
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: String,
    },
    MemberJoin {
        guild: GuildId,
        user: UserId,
    },
    MemberRemove {
        guild: GuildId,
        user: UserId,
    },
    Disconnected,
}

/// Concurrent snapshot of platform state, kept current by the event source.
/// Lookups return owned clones so no shard lock outlives a call.
#[derive(Default)]
pub struct Directory {
    guilds: DashMap<GuildId, Guild>,
    channels: DashMap<ChannelId, Channel>,
    profiles: DashMap<UserId, Profile>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_guild(&self, guild: Guild) {
        self.guilds.insert(guild.id, guild);
    }

    pub fn upsert_channel(&self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    pub fn upsert_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn add_member(&self, guild: GuildId, user: UserId) {
        if let Some(mut entry) = self.guilds.get_mut(&guild) {
            entry.members.insert(user);
        }
    }

    pub fn remove_member(&self, guild: GuildId, user: UserId) {
        if let Some(mut entry) = self.guilds.get_mut(&guild) {
            entry.members.remove(&user);
        }
    }

    pub fn guild(&self, id: GuildId) -> Option<Guild> {
        self.guilds.get(&id).map(|g| g.value().clone())
    }

    pub fn channel(&self, id: ChannelId) -> Option<Channel> {
        self.channels.get(&id).map(|c| c.value().clone())
    }

    pub fn profile(&self, id: UserId) -> Option<Profile> {
        self.profiles.get(&id).map(|p| p.value().clone())
    }

    pub fn guilds(&self) -> Vec<Guild> {
        self.guilds.iter().map(|g| g.value().clone()).collect()
    }

    /// The guild a channel belongs to, if any.
    pub fn guild_of_channel(&self, channel: ChannelId) -> Option<Guild> {
        let guild = self.channel(channel)?.guild?;
        self.guild(guild)
    }

    /// Text channels of one guild.
    pub fn channels_of(&self, guild: GuildId) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|c| c.guild == Some(guild))
            .map(|c| c.value().clone())
            .collect()
    }

    pub fn is_member(&self, guild: GuildId, user: UserId) -> bool {
        self.guilds
            .get(&guild)
            .is_some_and(|g| g.members.contains(&user))
    }

    /// Find a guild by exact name.
    pub fn guild_named(&self, name: &str) -> Option<Guild> {
        self.guilds
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.value().clone())
    }

    /// All guilds whose name contains `needle`.
    pub fn guilds_matching(&self, needle: &str) -> Vec<Guild> {
        self.guilds
            .iter()
            .filter(|g| g.name.contains(needle))
            .map(|g| g.value().clone())
            .collect()
    }

    /// Find a guild member by mention (`<@id>` / `<@!id>`) or by
    /// case-insensitive name substring.
    pub fn member_named(&self, guild: &Guild, needle: &str) -> Option<Profile> {
        if let Some(id) = parse_mention(needle) {
            return guild
                .members
                .contains(&id)
                .then(|| self.profile(id))
                .flatten();
        }

        let needle = needle.to_lowercase();
        guild.members.iter().find_map(|id| {
            self.profile(*id)
                .filter(|p| p.name.to_lowercase().contains(&needle))
        })
    }
}

/// Parse a `<@id>` or `<@!id>` user mention.
pub fn parse_mention(text: &str) -> Option<UserId> {
    let inner = text.strip_prefix("<@")?.strip_suffix('>')?;
    let digits = inner.strip_prefix('!').unwrap_or(inner);
    digits.parse().ok()
}
