//! Per-guild user standing commands: grant, revoke, and list admin or
//! blacklist standing.

use crate::access::{PrivilegeLevel, Resolver};
use crate::commands::{Action, Args, Commands, Context, HandlerSpec, Param};
use crate::db::Membership;
use crate::error::{CommandError, CommandResult};
use crate::platform::{Guild, Location};
use adjutant_store::Record as _;
use async_trait::async_trait;
use std::sync::Arc;

/// Level required to manage standing in a guild.
const MANAGE_LEVEL: PrivilegeLevel = PrivilegeLevel::GuildOwner;

pub(super) fn register(commands: &Commands) {
    commands.register(
        HandlerSpec::new("add user", Arc::new(AddUser))
            .level(MANAGE_LEVEL)
            .describe(
                "Grants a user admin or blacklist standing in a guild. \
                 Admins may give the bot guild-level commands without holding \
                 any platform permission there; blacklisted users are ignored \
                 entirely. Blacklist wins when a user holds both.",
            )
            .param(Param::required("username"))
            .param(Param::required("usertype"))
            .param(Param::defaulted("guildname", "here")),
    );
    commands.register(
        HandlerSpec::new("remove user", Arc::new(RemoveUser))
            .level(MANAGE_LEVEL)
            .describe(
                "Revokes admin or blacklist standing given through `add user`. \
                 Records holding no remaining standing are removed.",
            )
            .param(Param::required("username"))
            .param(Param::required("usertype"))
            .param(Param::defaulted("guildname", "here")),
    );
    commands.register(
        HandlerSpec::new("list users", Arc::new(ListUsers))
            .level(MANAGE_LEVEL)
            .describe(
                "Lists standing given through `add user`, limited to guilds \
                 where you hold the manage level. Name a guild or use \
                 \"here\" to narrow the listing.",
            )
            .param(Param::defaulted("listtype", "both"))
            .param(Param::optional("guildname"))
            .param(Param::optional("username")),
    );
}

async fn caller_level(ctx: &Context, location: Location) -> PrivilegeLevel {
    let resolver = Resolver {
        directory: &ctx.bot.directory,
        db: &ctx.bot.db,
        owners: &ctx.bot.config.bot.owners,
    };
    resolver.resolve(ctx.message.author, location).await
}

/// Resolve a guild argument: `here` means the guild of the current channel,
/// anything else is an exact name, then a substring over guilds where the
/// caller holds the manage level.
async fn guild_from_name(ctx: &Context, name: &str) -> Result<Guild, CommandError> {
    if name.eq_ignore_ascii_case("here") {
        let channel = ctx
            .bot
            .directory
            .channel(ctx.message.channel)
            .ok_or_else(|| CommandError::user("This channel is unknown to me"))?;
        if channel.is_private() {
            return Err(CommandError::user(
                "This command isn't supported in private conversations",
            ));
        }
        return ctx
            .bot
            .directory
            .guild_of_channel(channel.id)
            .ok_or_else(|| CommandError::user("This channel belongs to no guild"));
    }

    if let Some(guild) = ctx.bot.directory.guild_named(name) {
        return Ok(guild);
    }
    for guild in ctx.bot.directory.guilds_matching(name) {
        if caller_level(ctx, Location::Guild(guild.id)).await >= MANAGE_LEVEL {
            return Ok(guild);
        }
    }
    Err(CommandError::User(format!("Guild `{name}` not found")))
}

struct AddUser;

#[async_trait]
impl Action for AddUser {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let guild = guild_from_name(ctx, args.value("guildname")).await?;
        let username = args.value("username");
        let target = ctx
            .bot
            .directory
            .member_named(&guild, username)
            .ok_or_else(|| CommandError::User(format!("User `{username}` not found")))?;

        let (_, mut membership) = ctx.bot.db.ensure_standing(target.id, guild.id).await?;

        match args.value("usertype") {
            "admin" => {
                membership.admin = true;
                ctx.bot.db.memberships().save(&mut membership).await?;
                ctx.reply(format!(
                    "Admin `{}` added to `{}` successfully",
                    target.name, guild.name
                ))
                .await;
                Ok(())
            }
            "blacklist" => {
                membership.blacklisted = true;
                ctx.bot.db.memberships().save(&mut membership).await?;
                ctx.reply(format!(
                    "Blacklist `{}` added to `{}` successfully",
                    target.name, guild.name
                ))
                .await;
                Ok(())
            }
            other => Err(CommandError::User(format!("Unknown user type `{other}`"))),
        }
    }
}

struct RemoveUser;

#[async_trait]
impl Action for RemoveUser {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let guild = guild_from_name(ctx, args.value("guildname")).await?;
        let username = args.value("username");
        let target = ctx
            .bot
            .directory
            .member_named(&guild, username)
            .ok_or_else(|| CommandError::User(format!("User `{username}` not found")))?;

        let (mut user, mut membership) = ctx.bot.db.ensure_standing(target.id, guild.id).await?;

        let noun = match args.value("usertype") {
            "admin" => {
                membership.admin = false;
                "Admin"
            }
            "blacklist" => {
                membership.blacklisted = false;
                "Blacklist"
            }
            other => return Err(CommandError::User(format!("Unknown user type `{other}`"))),
        };

        ctx.bot.db.memberships().save(&mut membership).await?;
        ctx.bot.db.cleanup_standing(&mut membership, &mut user).await?;

        ctx.reply(format!(
            "{noun} `{}` removed from `{}` successfully",
            target.name, guild.name
        ))
        .await;
        Ok(())
    }
}

struct ListUsers;

#[async_trait]
impl Action for ListUsers {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let listtype = args.value("listtype");
        let guild = match args.value("guildname") {
            "" => None,
            name => Some(guild_from_name(ctx, name).await?),
        };
        let username = args.value("username").to_lowercase();

        let mut pieces = Vec::new();
        for user in ctx.bot.db.users().list_all(None, None).await? {
            let Some(user_id) = user.id() else { continue };
            for membership in ctx.bot.db.memberships_of_user(user_id).await? {
                if !matches_listtype(&membership, listtype)? {
                    continue;
                }
                if let Some(guild) = &guild
                    && guild.id != membership.guild_did
                {
                    continue;
                }
                if caller_level(ctx, Location::Guild(membership.guild_did)).await < MANAGE_LEVEL {
                    continue;
                }

                let name = ctx
                    .bot
                    .directory
                    .profile(user.user_did)
                    .map_or_else(|| user.user_did.to_string(), |p| p.name);
                if !username.is_empty() && !name.to_lowercase().contains(&username) {
                    continue;
                }

                let guild_name = ctx
                    .bot
                    .directory
                    .guild(membership.guild_did)
                    .map_or_else(|| membership.guild_did.to_string(), |g| g.name);

                let mut piece = format!("`{guild_name}`: `{name}`");
                if membership.admin {
                    piece.push_str(" `admin`");
                }
                if membership.blacklisted {
                    piece.push_str(" `blacklisted`");
                }
                pieces.push(piece);
            }
        }

        if pieces.is_empty() {
            ctx.reply("No users found.").await;
        } else {
            ctx.reply(pieces.join("\n")).await;
        }
        Ok(())
    }
}

fn matches_listtype(membership: &Membership, listtype: &str) -> Result<bool, CommandError> {
    match listtype {
        "admin" => Ok(membership.admin),
        "blacklist" => Ok(membership.blacklisted),
        "" | "both" => Ok(true),
        other => Err(CommandError::User(format!(
            "Unrecognised list type `{other}`"
        ))),
    }
}
