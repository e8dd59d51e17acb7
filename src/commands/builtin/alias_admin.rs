//! Alias management: short words standing in for canonical command paths.

use crate::access::PrivilegeLevel;
use crate::commands::{Action, Args, Commands, Context, HandlerSpec, Param};
use crate::db::CommandAlias;
use crate::error::{CommandError, CommandResult};
use adjutant_store::Order;
use async_trait::async_trait;
use std::sync::Arc;

pub(super) fn register(commands: &Commands) {
    commands.register(
        HandlerSpec::new("add alias", Arc::new(AddAlias))
            .level(PrivilegeLevel::GlobalAdmin)
            .describe(
                "Persists an alias for a command path. The alias is a single \
                 word; the target must be an existing command.",
            )
            .param(Param::required("alias"))
            .param(Param::required("command")),
    );
    commands.register(
        HandlerSpec::new("remove alias", Arc::new(RemoveAlias))
            .level(PrivilegeLevel::GlobalAdmin)
            .describe("Removes a persisted alias.")
            .param(Param::required("alias")),
    );
    commands.register(
        HandlerSpec::new("list aliases", Arc::new(ListAliases))
            .level(PrivilegeLevel::GlobalAdmin)
            .describe("Lists every persisted alias and its target."),
    );
}

struct AddAlias;

#[async_trait]
impl Action for AddAlias {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let alias = args.value("alias");
        let command = args.value("command");

        if !ctx.bot.commands.path_exists(command) {
            return Err(CommandError::User(format!("Command `{command}` not found")));
        }
        if ctx.bot.db.alias_named(alias).await?.is_some() {
            return Err(CommandError::User(format!("Alias `{alias}` already exists")));
        }

        let mut record = CommandAlias::new(alias, command);
        ctx.bot.db.aliases().save(&mut record).await?;
        ctx.reply(format!("Alias `{alias}` now runs `{command}`")).await;
        Ok(())
    }
}

struct RemoveAlias;

#[async_trait]
impl Action for RemoveAlias {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let alias = args.value("alias");
        let mut record = ctx
            .bot
            .db
            .alias_named(alias)
            .await?
            .ok_or_else(|| CommandError::User(format!("Alias `{alias}` not found")))?;
        ctx.bot.db.aliases().delete(&mut record).await?;
        ctx.reply(format!("Alias `{alias}` removed")).await;
        Ok(())
    }
}

struct ListAliases;

#[async_trait]
impl Action for ListAliases {
    async fn run(&self, ctx: &Context, _args: &Args) -> CommandResult {
        let aliases = ctx
            .bot
            .db
            .aliases()
            .list_all(Some(Order::asc("alias")), None)
            .await?;
        if aliases.is_empty() {
            ctx.reply("No aliases defined.").await;
            return Ok(());
        }
        let lines: Vec<String> = aliases
            .iter()
            .map(|a| format!("`{}`: `{}`", a.alias, a.command))
            .collect();
        ctx.reply(lines.join("\n")).await;
        Ok(())
    }
}
