//! adjutant - chat-bot core daemon.

use adjutant::bot::Bot;
use adjutant::config::Config;
use adjutant::db::Database;
use adjutant::platform::Directory;
use anyhow::Context as _;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut config_path = "config.toml".to_string();
    let mut check_schema = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--check-schema" => check_schema = true,
            other => config_path = other.to_string(),
        }
    }

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load config");
        e
    })?;

    info!(bot = %config.bot.name, "starting adjutant");

    // Opening the database registers every record model, forcing each one
    // through the schema reconciliation check. Failure here is fatal: an
    // inconsistent schema is never served.
    let db = Database::open(&config.database.path)
        .await
        .context("schema registration failed")?;

    if check_schema {
        info!("schema check complete");
        return Ok(());
    }

    // The platform gateway collaborator owns the far ends of these queues:
    // it feeds `events_tx` and drains `outbox_rx`.
    let (outbox_tx, mut outbox_rx) = mpsc::channel(256);
    let (_events_tx, events_rx) = mpsc::channel(256);

    let bot = Bot::new(config, db, Directory::new(), outbox_tx);

    tokio::spawn(async move {
        while let Some(outbound) = outbox_rx.recv().await {
            info!(channel = outbound.channel, "outbound reply queued");
        }
    });

    let signal_bot = bot.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_bot.shutdown();
        }
    });

    bot.run(events_rx).await;
    Ok(())
}
