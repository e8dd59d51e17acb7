//! The bot: configuration, state, command tree, and the control loop.
//!
//! One loop pumps inbound platform events. Messages go through command
//! extraction and dispatch; every event also fans out to registered hooks as
//! spawned tasks. Replies leave through the outbox channel, drained by the
//! platform gateway. Shutdown is cooperative: the liveness flag flips, the
//! loop drains, and in-flight handler tasks finish on their own.

use crate::commands::Commands;
use crate::config::Config;
use crate::db::Database;
use crate::platform::{ChannelId, Directory, Event, Message, Outbound};
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info, warn};

/// A consumer of platform events beyond command dispatch. Hook failures are
/// logged and never fatal.
#[async_trait]
pub trait EventHook: Send + Sync {
    async fn on_event(&self, bot: &Arc<Bot>, event: &Event) -> anyhow::Result<()>;
}

pub struct Bot {
    pub config: Config,
    pub db: Database,
    pub directory: Directory,
    pub commands: Commands,
    outbox: mpsc::Sender<Outbound>,
    hooks: RwLock<Vec<Arc<dyn EventHook>>>,
    alive: AtomicBool,
    shutdown: Notify,
    mention: Regex,
}

impl Bot {
    /// Assemble a bot with the built-in command set.
    pub fn new(
        config: Config,
        db: Database,
        directory: Directory,
        outbox: mpsc::Sender<Outbound>,
    ) -> Arc<Self> {
        Self::with_commands(config, db, directory, outbox, Commands::with_builtins())
    }

    /// Assemble a bot around a caller-supplied command tree.
    pub fn with_commands(
        config: Config,
        db: Database,
        directory: Directory,
        outbox: mpsc::Sender<Outbound>,
        commands: Commands,
    ) -> Arc<Self> {
        let mention = Regex::new(&format!(r"^<@!?{}>\s*", config.bot.user_id))
            .expect("mention pattern is valid");
        Arc::new(Self {
            config,
            db,
            directory,
            commands,
            outbox,
            hooks: RwLock::new(Vec::new()),
            alive: AtomicBool::new(true),
            shutdown: Notify::new(),
            mention,
        })
    }

    pub fn add_hook(&self, hook: Arc<dyn EventHook>) {
        self.hooks.write().push(hook);
    }

    /// Liveness flag. Long-running background loops check this each
    /// iteration instead of being interrupted externally.
    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Request shutdown: flips the liveness flag and wakes the control loop.
    /// `notify_one` stores a permit, so a request landing between loop
    /// iterations is not lost.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::Relaxed);
        self.shutdown.notify_one();
    }

    /// Queue a reply for delivery.
    pub async fn send(&self, channel: ChannelId, text: impl Into<String>) {
        let outbound = Outbound {
            channel,
            text: text.into(),
        };
        if self.outbox.send(outbound).await.is_err() {
            warn!(channel = channel, "outbox closed; reply dropped");
        }
    }

    /// Extract command text from a message: a mention prefix addresses the
    /// bot in shared channels, any text does in private ones.
    pub fn command_text(&self, message: &Message) -> Option<String> {
        if let Some(found) = self.mention.find(&message.content) {
            return Some(message.content[found.end()..].to_string());
        }
        let private = self
            .directory
            .channel(message.channel)
            .is_some_and(|c| c.is_private());
        private.then(|| message.content.clone())
    }

    /// Pump inbound events until shutdown is requested or the event source
    /// closes its channel.
    pub async fn run(self: &Arc<Self>, mut events: mpsc::Receiver<Event>) {
        info!(bot = %self.config.bot.name, "control loop started");
        while self.alive() {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        info!(bot = %self.config.bot.name, "control loop stopped");
    }

    async fn handle_event(self: &Arc<Self>, event: Event) {
        match &event {
            Event::Message(message) => {
                if message.author != self.config.bot.user_id
                    && let Some(command) = self.command_text(message)
                    && !command.is_empty()
                {
                    let handled = self.commands.dispatch(self, &command, message).await;
                    if !handled {
                        debug!(command = %command, "no command found");
                    }
                }
            }
            Event::MemberJoin { guild, user } => self.directory.add_member(*guild, *user),
            Event::MemberRemove { guild, user } => self.directory.remove_member(*guild, *user),
            _ => {}
        }

        let hooks: Vec<Arc<dyn EventHook>> = self.hooks.read().clone();
        for hook in hooks {
            let bot = self.clone();
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = hook.on_event(&bot, &event).await {
                    warn!(error = %e, "event hook failed");
                }
            });
        }
    }
}
