//! Integration tests for command routing: trie resolution, alias
//! indirection, permission gating, concurrent fan-out, argument binding,
//! and the command protocol.

mod common;

use adjutant::access::PrivilegeLevel;
use adjutant::commands::{Action, Args, Commands, Context, HandlerSpec, Param};
use adjutant::db::CommandAlias;
use adjutant::error::{CommandError, CommandResult};
use async_trait::async_trait;
use common::*;
use std::sync::Arc;

/// Replies with a fixed string.
struct Reply(&'static str);

#[async_trait]
impl Action for Reply {
    async fn run(&self, ctx: &Context, _args: &Args) -> CommandResult {
        ctx.reply(self.0).await;
        Ok(())
    }
}

/// Replies with its bound arguments, pipe-separated in declaration order.
struct EchoArgs(Vec<&'static str>);

#[async_trait]
impl Action for EchoArgs {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult {
        let rendered: Vec<&str> = self.0.iter().map(|name| args.value(name)).collect();
        ctx.reply(rendered.join("|")).await;
        Ok(())
    }
}

/// Always fails unexpectedly.
struct Explode;

#[async_trait]
impl Action for Explode {
    async fn run(&self, _ctx: &Context, _args: &Args) -> CommandResult {
        Err(CommandError::Internal(anyhow::anyhow!("boom")))
    }
}

#[tokio::test]
async fn resolution_returns_deepest_node_and_remainder() {
    let commands = Commands::new();
    commands.register(
        HandlerSpec::new("add user", Arc::new(Reply("user")))
            .level(PrivilegeLevel::Member)
            .param(Param::required("username")),
    );
    commands.register(
        HandlerSpec::new("add role", Arc::new(Reply("role")))
            .level(PrivilegeLevel::Member)
            .param(Param::required("rolename")),
    );
    let mut fixture = test_bot_with(commands).await;

    let resolution = fixture
        .bot
        .commands
        .resolve(&fixture.bot.db, "add user Bob", PrivilegeLevel::Member)
        .await;
    assert_eq!(resolution.path, ["add", "user"]);
    assert_eq!(resolution.remainder, "Bob");
    assert_eq!(resolution.handlers.len(), 1);

    // An unrecognized word stops the descent and stays in the remainder.
    let resolution = fixture
        .bot
        .commands
        .resolve(&fixture.bot.db, "add widget now", PrivilegeLevel::Member)
        .await;
    assert_eq!(resolution.path, ["add"]);
    assert_eq!(resolution.remainder, "widget now");

    let msg = message(OWNER, HALL, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "add user Bob", &msg)
        .await;
    assert!(handled);
    assert_eq!(next_reply(&mut fixture.outbox).await.text, "user");
}

#[tokio::test]
async fn alias_dispatch_matches_the_canonical_command() {
    let commands = Commands::new();
    commands.register(
        HandlerSpec::new("add user", Arc::new(EchoArgs(vec!["username", "usertype"])))
            .level(PrivilegeLevel::Member)
            .param(Param::required("username"))
            .param(Param::required("usertype")),
    );
    let mut fixture = test_bot_with(commands).await;

    let mut alias = CommandAlias::new("au", "add user");
    fixture
        .bot
        .db
        .aliases()
        .save(&mut alias)
        .await
        .expect("save alias");

    let msg = message(OWNER, HALL, "");
    assert!(
        fixture
            .bot
            .commands
            .dispatch(&fixture.bot, "add user Bob admin", &msg)
            .await
    );
    let direct = next_reply(&mut fixture.outbox).await;

    assert!(
        fixture
            .bot
            .commands
            .dispatch(&fixture.bot, "au Bob admin", &msg)
            .await
    );
    let aliased = next_reply(&mut fixture.outbox).await;

    assert_eq!(direct, aliased);
    assert_eq!(aliased.text, "Bob|admin");
}

#[tokio::test]
async fn alias_to_an_unreachable_target_is_left_unmatched() {
    let commands = Commands::new();
    commands.register(
        HandlerSpec::new("add user", Arc::new(Reply("user")))
            .level(PrivilegeLevel::GlobalAdmin)
            .param(Param::required("username")),
    );
    let fixture = test_bot_with(commands).await;

    let mut alias = CommandAlias::new("au", "add user");
    fixture
        .bot
        .db
        .aliases()
        .save(&mut alias)
        .await
        .expect("save alias");

    // Below the target's level the splice must not apply; the alias word
    // binds as the first argument of the stopping node instead.
    let resolution = fixture
        .bot
        .commands
        .resolve(&fixture.bot.db, "au Bob", PrivilegeLevel::Member)
        .await;
    assert!(resolution.path.is_empty());
    assert_eq!(resolution.remainder, "au Bob");

    let msg = message(MALLORY, HALL, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "au Bob", &msg)
        .await;
    assert!(!handled);
}

#[tokio::test]
async fn handlers_above_the_caller_level_are_excluded() {
    let commands = Commands::new();
    commands.register(
        HandlerSpec::new("audit", Arc::new(Reply("secret")))
            .level(PrivilegeLevel::GlobalAdmin),
    );
    commands.register(
        HandlerSpec::new("audit", Arc::new(Reply("public"))).level(PrivilegeLevel::Member),
    );
    let mut fixture = test_bot_with(commands).await;

    // Mallory resolves to Member in the hall: only the public handler runs.
    let msg = message(MALLORY, HALL, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "audit", &msg)
        .await;
    assert!(handled);
    assert_eq!(next_reply(&mut fixture.outbox).await.text, "public");

    // An outsider resolves to no access: nothing is eligible.
    let msg = message(OUTSIDER, HALL, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "audit", &msg)
        .await;
    assert!(!handled);
}

#[tokio::test]
async fn sibling_handlers_run_concurrently_and_failures_stay_contained() {
    let commands = Commands::new();
    commands.register(
        HandlerSpec::new("ping", Arc::new(Reply("pong"))).level(PrivilegeLevel::Member),
    );
    commands.register(HandlerSpec::new("ping", Arc::new(Explode)).level(PrivilegeLevel::Member));
    let mut fixture = test_bot_with(commands).await;

    let msg = message(MALLORY, HALL, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "ping", &msg)
        .await;
    assert!(handled);

    let first = next_reply(&mut fixture.outbox).await.text;
    let second = next_reply(&mut fixture.outbox).await.text;
    let mut replies = [first, second];
    replies.sort();
    let mut expected = ["pong".to_string(), APOLOGY.to_string()];
    expected.sort();
    assert_eq!(replies, expected);
}

#[tokio::test]
async fn final_parameter_absorbs_embedded_whitespace() {
    let commands = Commands::new();
    commands.register(
        HandlerSpec::new("note", Arc::new(EchoArgs(vec!["name", "note"])))
            .level(PrivilegeLevel::Member)
            .param(Param::required("name"))
            .param(Param::optional("note")),
    );
    let mut fixture = test_bot_with(commands).await;

    let msg = message(MALLORY, HALL, "");
    fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "note Bob loves cake and pie", &msg)
        .await;
    assert_eq!(
        next_reply(&mut fixture.outbox).await.text,
        "Bob|loves cake and pie"
    );
}

#[tokio::test]
async fn missing_mandatory_argument_reports_usage() {
    let commands = Commands::new();
    commands.register(
        HandlerSpec::new("note", Arc::new(EchoArgs(vec!["name"])))
            .level(PrivilegeLevel::Member)
            .param(Param::required("name"))
            .param(Param::optional("note")),
    );
    let mut fixture = test_bot_with(commands).await;

    let msg = message(MALLORY, HALL, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "note", &msg)
        .await;
    assert!(handled);
    assert_eq!(
        next_reply(&mut fixture.outbox).await.text,
        "Syntax: `note <name> <note (optional)>`"
    );
}

#[tokio::test]
async fn command_protocol_strips_mentions_and_passes_private_text() {
    let fixture = test_bot().await;

    let shared = message(MALLORY, HALL, "<@999> help me");
    assert_eq!(
        fixture.bot.command_text(&shared).as_deref(),
        Some("help me")
    );

    let nick_form = message(MALLORY, HALL, "<@!999> help");
    assert_eq!(fixture.bot.command_text(&nick_form).as_deref(), Some("help"));

    let bare = message(MALLORY, HALL, "help");
    assert_eq!(fixture.bot.command_text(&bare), None);

    let private = message(MALLORY, DM, "help");
    assert_eq!(fixture.bot.command_text(&private).as_deref(), Some("help"));
}

#[tokio::test]
async fn quit_command_flips_the_liveness_flag() {
    let mut fixture = test_bot().await;
    assert!(fixture.bot.alive());

    let msg = message(OWNER, HALL, "");
    let handled = fixture
        .bot
        .commands
        .dispatch(&fixture.bot, "quit", &msg)
        .await;
    assert!(handled);
    assert_eq!(next_reply(&mut fixture.outbox).await.text, "Shutting down.");
    assert!(!fixture.bot.alive());
}
