//! General commands: help, say, directory listings, shutdown.

use crate::access::{PrivilegeLevel, Resolver};
use crate::commands::{Action, Args, Commands, Context, HandlerSpec, Param};
use crate::error::CommandResult;
use crate::platform::{ChannelKind, Location};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub(super) fn register(commands: &Commands) {
    commands.register(
        HandlerSpec::new("help", Arc::new(Help))
            .level(PrivilegeLevel::User)
            .describe(
                "Lists the commands available to you here. Name a command to \
                 see its syntax and description.",
            )
            .param(Param::optional("command")),
    );
    commands.register(
        HandlerSpec::new("say", Arc::new(Say))
            .level(PrivilegeLevel::GuildBotAdmin)
            .describe("Repeats the given text in this channel.")
            .param(Param::required("text")),
    );
    commands.register(
        HandlerSpec::new("list all channels", Arc::new(ListAllChannels))
            .level(PrivilegeLevel::GlobalAdmin)
            .describe("Lists the channels the bot can currently see.")
            .param(Param::optional("filter")),
    );
    commands.register(
        HandlerSpec::new("list all users", Arc::new(ListAllUsers))
            .level(PrivilegeLevel::GlobalAdmin)
            .describe("Lists the users the bot can currently see.")
            .param(Param::optional("filter")),
    );
    commands.register(
        HandlerSpec::new("quit", Arc::new(Quit))
            .level(PrivilegeLevel::BotOwner)
            .describe("Shuts the bot down after in-flight work completes."),
    );
}

struct Help;

#[async_trait]
impl Action for Help {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let resolver = Resolver {
            directory: &ctx.bot.directory,
            db: &ctx.bot.db,
            owners: &ctx.bot.config.bot.owners,
        };
        let level = resolver
            .resolve(ctx.message.author, Location::Channel(ctx.message.channel))
            .await;

        let wanted = args.value("command");
        let entries = if wanted.is_empty() {
            ctx.bot.commands.visible_handlers(level)
        } else {
            let words: Vec<&str> = wanted.split_whitespace().collect();
            ctx.bot.commands.subtree_handlers(&words, level)
        };

        if entries.is_empty() {
            ctx.reply("No commands found.").await;
            return Ok(());
        }

        let lines: Vec<String> = entries
            .iter()
            .map(|(syntax, description)| {
                let summary = description.lines().next().unwrap_or("");
                if summary.is_empty() {
                    format!("`{syntax}`")
                } else {
                    format!("`{syntax}`: {summary}")
                }
            })
            .collect();
        ctx.reply(lines.join("\n")).await;
        Ok(())
    }
}

struct Say;

#[async_trait]
impl Action for Say {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        ctx.reply(args.value("text").to_string()).await;
        Ok(())
    }
}

struct ListAllChannels;

#[async_trait]
impl Action for ListAllChannels {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let filter = args.value("filter").to_lowercase();
        let mut guilds = ctx.bot.directory.guilds();
        guilds.sort_by(|a, b| a.name.cmp(&b.name));

        let mut lines = Vec::new();
        for guild in guilds {
            let mut channels = ctx.bot.directory.channels_of(guild.id);
            channels.retain(|c| {
                c.kind == ChannelKind::Text && c.name.to_lowercase().contains(&filter)
            });
            if channels.is_empty() {
                continue;
            }
            channels.sort_by_key(|c| c.id);

            lines.push(format!("Guild: `{}`", guild.name));
            for channel in channels {
                lines.push(format!("    `{}`: `{}`", channel.id, channel.name));
            }
        }

        if lines.is_empty() {
            ctx.reply("No channels found").await;
        } else {
            ctx.reply(lines.join("\n")).await;
        }
        Ok(())
    }
}

struct ListAllUsers;

#[async_trait]
impl Action for ListAllUsers {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let filter = args.value("filter").to_lowercase();
        let mut guilds = ctx.bot.directory.guilds();
        guilds.sort_by(|a, b| a.name.cmp(&b.name));

        let mut lines = Vec::new();
        for guild in guilds {
            let mut members: Vec<_> = guild
                .members
                .iter()
                .filter_map(|id| ctx.bot.directory.profile(*id))
                .filter(|p| p.name.to_lowercase().contains(&filter))
                .collect();
            if members.is_empty() {
                continue;
            }
            members.sort_by_key(|p| p.id);

            lines.push(format!("Guild: `{}`", guild.name));
            for member in members {
                let mut line = format!("    `{}`: `{}`", member.id, member.name);
                if member.bot {
                    line.push_str(" `BOT`");
                }
                lines.push(line);
            }
        }

        if lines.is_empty() {
            ctx.reply("No users found").await;
        } else {
            ctx.reply(lines.join("\n")).await;
        }
        Ok(())
    }
}

struct Quit;

#[async_trait]
impl Action for Quit {
    async fn run(&self, ctx: &Context, _args: &Args) -> CommandResult {
        info!(author = ctx.message.author, "shutdown command received");
        ctx.reply("Shutting down.").await;
        ctx.bot.shutdown();
        Ok(())
    }
}
