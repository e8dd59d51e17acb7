//! Integration test common infrastructure.
//!
//! Builds a bot over an in-memory store with a small fixed platform view
//! and a capturing outbox.

#![allow(dead_code)]

use adjutant::bot::Bot;
use adjutant::commands::Commands;
use adjutant::config::{BotConfig, Config, DatabaseConfig};
use adjutant::db::Database;
use adjutant::platform::{Channel, Directory, Guild, Message, Outbound, Profile};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Bot owner and owner of the `haven` guild.
pub const OWNER: i64 = 1;
/// Ordinary member, named `Bob`; targeted by standing commands.
pub const BOB: i64 = 2;
/// Ordinary member, named `Mallory`.
pub const MALLORY: i64 = 3;
/// Not a member of anything.
pub const OUTSIDER: i64 = 9;
/// The bot's own platform id.
pub const BOT_ID: i64 = 999;

pub const HAVEN: i64 = 100;
/// Text channel in `haven`.
pub const HALL: i64 = 10;
/// Second text channel in `haven`.
pub const SIDEBAR: i64 = 11;
/// One-to-one conversation between Mallory and the bot.
pub const DM: i64 = 20;
/// Group conversation owned by the guild owner.
pub const GROUP: i64 = 30;

pub const APOLOGY: &str = "that went sideways, sorry";

pub fn test_config() -> Config {
    Config {
        bot: BotConfig {
            user_id: BOT_ID,
            owners: vec![OWNER],
            name: "adjutant-test".to_string(),
            apology: APOLOGY.to_string(),
        },
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
    }
}

pub fn test_directory() -> Directory {
    let directory = Directory::new();
    directory.upsert_guild(
        Guild::new(HAVEN, "haven", OWNER)
            .with_member(BOB)
            .with_member(MALLORY),
    );
    directory.upsert_channel(Channel::text(HALL, HAVEN, "hall"));
    directory.upsert_channel(Channel::text(SIDEBAR, HAVEN, "sidebar"));
    directory.upsert_channel(Channel::private(DM, vec![MALLORY, BOT_ID]));
    directory.upsert_channel(Channel::group(GROUP, OWNER, vec![OWNER, MALLORY]));
    directory.upsert_profile(Profile::new(OWNER, "Ada"));
    directory.upsert_profile(Profile::new(BOB, "Bob"));
    directory.upsert_profile(Profile::new(MALLORY, "Mallory"));
    directory
}

pub struct TestBot {
    pub bot: Arc<Bot>,
    pub outbox: mpsc::Receiver<Outbound>,
}

/// Bot with the built-in command set.
pub async fn test_bot() -> TestBot {
    test_bot_with(Commands::with_builtins()).await
}

/// Bot with a caller-supplied command tree.
pub async fn test_bot_with(commands: Commands) -> TestBot {
    let db = Database::open(":memory:").await.expect("open database");
    let (outbox_tx, outbox_rx) = mpsc::channel(64);
    let bot = Bot::with_commands(test_config(), db, test_directory(), outbox_tx, commands);
    TestBot {
        bot,
        outbox: outbox_rx,
    }
}

pub fn message(author: i64, channel: i64, content: &str) -> Message {
    Message {
        id: 1,
        author,
        channel,
        content: content.to_string(),
    }
}

/// Await the next queued reply, failing the test after two seconds.
pub async fn next_reply(outbox: &mut mpsc::Receiver<Outbound>) -> Outbound {
    timeout(Duration::from_secs(2), outbox.recv())
        .await
        .expect("timed out waiting for a reply")
        .expect("outbox closed")
}
