//! Privilege levels and their resolution.
//!
//! Resolution is a pure read over the platform [`Directory`] and persisted
//! standing records. It never mutates anything, never fails (store errors
//! degrade to "no persisted facts" with a logged warning), and is safe to
//! call concurrently.

use crate::db::{Database, Membership, User};
use crate::platform::{Channel, ChannelKind, Directory, GuildId, Location, UserId};
use adjutant_store::Record as _;
use tracing::warn;

/// Strictly ordered privilege ladder. Comparison follows declaration order;
/// anything above `NoAccess` counts as granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrivilegeLevel {
    /// Globally denylisted; outranked by nothing.
    Blacklisted,
    /// Denylisted within the resolved guild.
    GuildBlacklisted,
    NoAccess,
    /// Authenticated but without member standing at the location.
    User,
    /// Ordinary guild member.
    Member,
    /// Granted bot-admin standing in the guild through a persisted record.
    GuildBotAdmin,
    /// Holds platform management capability at the location.
    GuildAdmin,
    GuildOwner,
    GlobalAdmin,
    BotOwner,
}

impl PrivilegeLevel {
    /// The no-access boundary: a level grants anything only above it.
    pub fn granted(self) -> bool {
        self > Self::NoAccess
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Blacklisted => "blacklisted",
            Self::GuildBlacklisted => "guild blacklisted",
            Self::NoAccess => "no access",
            Self::User => "user",
            Self::Member => "member",
            Self::GuildBotAdmin => "guild bot admin",
            Self::GuildAdmin => "guild admin",
            Self::GuildOwner => "guild owner",
            Self::GlobalAdmin => "global admin",
            Self::BotOwner => "bot owner",
        };
        f.write_str(name)
    }
}

/// Borrowing view over everything resolution consults.
pub struct Resolver<'a> {
    pub directory: &'a Directory,
    pub db: &'a Database,
    pub owners: &'a [UserId],
}

impl Resolver<'_> {
    /// Resolve the privilege level of `user` at `location`. First match
    /// wins: owner allow-list, global blacklist, global admin, then the
    /// location-specific ladder.
    pub async fn resolve(&self, user: UserId, location: Location) -> PrivilegeLevel {
        if self.owners.contains(&user) {
            return PrivilegeLevel::BotOwner;
        }

        let record = self.user_record(user).await;
        if let Some(record) = &record {
            if record.blacklisted {
                return PrivilegeLevel::Blacklisted;
            }
            if record.global_admin {
                return PrivilegeLevel::GlobalAdmin;
            }
        }

        match location {
            Location::Guild(guild) => self.aggregate_level(user, guild, record.as_ref()).await,
            Location::Channel(channel) => match self.directory.channel(channel) {
                None => PrivilegeLevel::NoAccess,
                Some(channel) if channel.is_private() => Self::private_level(&channel, user),
                Some(channel) => self.channel_level(&channel, user, record.as_ref()).await,
            },
        }
    }

    /// Level within a private or group conversation.
    fn private_level(channel: &Channel, user: UserId) -> PrivilegeLevel {
        if !channel.recipients.contains(&user) {
            return PrivilegeLevel::NoAccess;
        }
        if channel.kind == ChannelKind::Group && channel.owner != Some(user) {
            return PrivilegeLevel::User;
        }
        PrivilegeLevel::GuildAdmin
    }

    /// Level within one guild channel.
    async fn channel_level(
        &self,
        channel: &Channel,
        user: UserId,
        record: Option<&User>,
    ) -> PrivilegeLevel {
        let Some(guild) = channel.guild.and_then(|g| self.directory.guild(g)) else {
            return PrivilegeLevel::NoAccess;
        };
        if !guild.members.contains(&user) {
            return PrivilegeLevel::NoAccess;
        }
        if guild.owner == user {
            return PrivilegeLevel::GuildOwner;
        }

        let membership = match record {
            Some(record) => self.membership_record(record, guild.id).await,
            None => None,
        };
        if membership.as_ref().is_some_and(|m| m.blacklisted) {
            return PrivilegeLevel::GuildBlacklisted;
        }
        if channel.managers.contains(&user) {
            return PrivilegeLevel::GuildAdmin;
        }
        if membership.as_ref().is_some_and(|m| m.admin) {
            return PrivilegeLevel::GuildBotAdmin;
        }
        PrivilegeLevel::Member
    }

    /// Aggregate level for a whole guild: the maximum over its channels,
    /// starting from the denylisted floor.
    async fn aggregate_level(
        &self,
        user: UserId,
        guild: GuildId,
        record: Option<&User>,
    ) -> PrivilegeLevel {
        let mut best = PrivilegeLevel::GuildBlacklisted;
        for channel in self.directory.channels_of(guild) {
            let level = self.channel_level(&channel, user, record).await;
            best = best.max(level);
        }
        best
    }

    async fn user_record(&self, user: UserId) -> Option<User> {
        match self.db.user_by_did(user).await {
            Ok(record) => record,
            Err(e) => {
                warn!(user = user, error = %e, "user standing lookup failed; treating as absent");
                None
            }
        }
    }

    async fn membership_record(&self, record: &User, guild: GuildId) -> Option<Membership> {
        let user_id = record.id()?;
        match self.db.membership_of(user_id, guild).await {
            Ok(membership) => membership,
            Err(e) => {
                warn!(guild = guild, error = %e, "membership lookup failed; treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_the_ladder() {
        assert!(PrivilegeLevel::BotOwner > PrivilegeLevel::GlobalAdmin);
        assert!(PrivilegeLevel::GlobalAdmin > PrivilegeLevel::GuildOwner);
        assert!(PrivilegeLevel::GuildOwner > PrivilegeLevel::GuildAdmin);
        assert!(PrivilegeLevel::GuildAdmin > PrivilegeLevel::GuildBotAdmin);
        assert!(PrivilegeLevel::GuildBotAdmin > PrivilegeLevel::Member);
        assert!(PrivilegeLevel::Member > PrivilegeLevel::User);
        assert!(PrivilegeLevel::User > PrivilegeLevel::NoAccess);
        assert!(PrivilegeLevel::NoAccess > PrivilegeLevel::GuildBlacklisted);
        assert!(PrivilegeLevel::GuildBlacklisted > PrivilegeLevel::Blacklisted);
    }

    #[test]
    fn granted_is_the_no_access_boundary() {
        assert!(PrivilegeLevel::User.granted());
        assert!(!PrivilegeLevel::NoAccess.granted());
        assert!(!PrivilegeLevel::Blacklisted.granted());
    }

    #[test]
    fn private_levels() {
        let private = Channel::private(20, vec![1, 2]);
        assert_eq!(
            Resolver::private_level(&private, 1),
            PrivilegeLevel::GuildAdmin
        );
        assert_eq!(
            Resolver::private_level(&private, 9),
            PrivilegeLevel::NoAccess
        );

        let group = Channel::group(30, 1, vec![1, 2, 3]);
        assert_eq!(
            Resolver::private_level(&group, 1),
            PrivilegeLevel::GuildAdmin
        );
        assert_eq!(Resolver::private_level(&group, 2), PrivilegeLevel::User);
    }
}
