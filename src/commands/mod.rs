//! Command registration, resolution, and dispatch.
//!
//! Inbound text is routed through a multi-word trie. Resolution descends one
//! word at a time, substituting persisted aliases, and stops at the deepest
//! node reachable at the caller's privilege level; whatever text was not
//! consumed becomes the handlers' positional arguments. Dispatch spawns one
//! independent task per eligible handler.

mod builtin;
mod dispatcher;
mod handler;

pub use dispatcher::DispatchNode;
pub use handler::{Action, Args, Context, Handler, HandlerSpec, Param};

use crate::access::{PrivilegeLevel, Resolver};
use crate::bot::Bot;
use crate::db::Database;
use crate::error::CommandError;
use crate::platform::{Location, Message};
use dispatcher::{bind_args, split_first};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of resolving an input string against the trie.
pub struct Resolution {
    /// Words consumed while descending; identifies the stopping node.
    pub path: Vec<String>,
    /// Unconsumed text, bound as arguments by the stopping node's handlers.
    pub remainder: String,
    /// Handlers registered at the stopping node, ungated.
    pub handlers: Vec<Arc<Handler>>,
}

/// The command tree and its dispatch front.
pub struct Commands {
    tree: RwLock<DispatchNode>,
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}

impl Commands {
    /// An empty tree, for callers that register everything themselves.
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(DispatchNode::root()),
        }
    }

    /// A tree pre-populated with the built-in command set.
    pub fn with_builtins() -> Self {
        let commands = Self::new();
        builtin::register_all(&commands);
        commands
    }

    pub fn register(&self, spec: HandlerSpec) {
        let path = spec.path;
        self.tree.write().register(path, spec.into_handler());
        debug!(command = path, "handler registered");
    }

    /// Resolve `input` to its stopping node at the given caller level.
    ///
    /// A word matching a persisted alias is replaced by the alias's
    /// canonical words before matching; the substitution applies only when
    /// every canonical word descends into a node reachable at `level`
    /// (all-or-nothing), and spliced words are not expanded again. A word
    /// that matches nothing stops the descent and stays in the remainder.
    pub async fn resolve(
        &self,
        db: &Database,
        input: &str,
        level: PrivilegeLevel,
    ) -> Resolution {
        let mut path: Vec<String> = Vec::new();
        let mut remaining = input.trim().to_string();

        loop {
            let (word, rest) = split_first(&remaining);
            if word.is_empty() {
                break;
            }

            let alias = match db.alias_named(word).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(alias = word, error = %e, "alias lookup failed; matching word as-is");
                    None
                }
            };

            let step = match alias {
                Some(alias) => {
                    let words: Vec<String> = alias
                        .command
                        .split_whitespace()
                        .map(str::to_string)
                        .collect();
                    self.descends(&path, &words, level).then_some(words)
                }
                None => {
                    let words = vec![word.to_string()];
                    self.descends(&path, &words, level).then_some(words)
                }
            };

            match step {
                Some(words) => {
                    path.extend(words);
                    remaining = rest.to_string();
                }
                None => break,
            }
        }

        let tree = self.tree.read();
        let handlers = tree
            .descend(&path)
            .map(|node| node.handlers().to_vec())
            .unwrap_or_default();
        Resolution {
            path,
            remainder: remaining,
            handlers,
        }
    }

    /// Whether every word in `words` descends from the node at `path` into
    /// children reachable at `level`.
    fn descends(&self, path: &[String], words: &[String], level: PrivilegeLevel) -> bool {
        if words.is_empty() {
            return false;
        }
        let tree = self.tree.read();
        let Some(mut node) = tree.descend(path) else {
            return false;
        };
        for word in words {
            match node.child(word) {
                Some(child) if child.reachable_at(level) => node = child,
                _ => return false,
            }
        }
        true
    }

    /// Resolve the caller's privilege level, then dispatch. Returns whether
    /// any handler was eligible, so the caller can decide on "no command
    /// found" feedback.
    pub async fn dispatch(&self, bot: &Arc<Bot>, text: &str, message: &Message) -> bool {
        let resolver = Resolver {
            directory: &bot.directory,
            db: &bot.db,
            owners: &bot.config.bot.owners,
        };
        let level = resolver
            .resolve(message.author, Location::Channel(message.channel))
            .await;
        self.dispatch_at(bot, text, message, level).await
    }

    /// Dispatch with an already-resolved caller level. Every eligible
    /// handler runs as its own spawned task; none waits for another.
    pub async fn dispatch_at(
        &self,
        bot: &Arc<Bot>,
        text: &str,
        message: &Message,
        level: PrivilegeLevel,
    ) -> bool {
        let resolution = self.resolve(&bot.db, text, level).await;
        let eligible: Vec<Arc<Handler>> = resolution
            .handlers
            .iter()
            .filter(|h| level >= h.min_level)
            .cloned()
            .collect();

        if eligible.is_empty() {
            debug!(command = %text, level = %level, "no eligible handler");
            return false;
        }

        for handler in eligible {
            tokio::spawn(run_handler(
                bot.clone(),
                handler,
                resolution.remainder.clone(),
                message.clone(),
                text.to_string(),
            ));
        }
        true
    }

    /// Syntax and description of every handler reachable at `level`, in
    /// tree order.
    pub fn visible_handlers(&self, level: PrivilegeLevel) -> Vec<(String, String)> {
        let tree = self.tree.read();
        let mut entries = Vec::new();
        tree.visit(&mut |_path, node| {
            for handler in node.handlers() {
                if level >= handler.min_level {
                    entries.push((handler.syntax.clone(), handler.description.clone()));
                }
            }
        });
        entries
    }

    /// Handlers at or below the node named by `path`, reachable at `level`.
    pub fn subtree_handlers(&self, path: &[&str], level: PrivilegeLevel) -> Vec<(String, String)> {
        let tree = self.tree.read();
        let path: Vec<String> = path.iter().map(|w| w.to_string()).collect();
        let Some(node) = tree.descend(&path) else {
            return Vec::new();
        };
        let mut entries = Vec::new();
        node.visit(&mut |_path, node| {
            for handler in node.handlers() {
                if level >= handler.min_level {
                    entries.push((handler.syntax.clone(), handler.description.clone()));
                }
            }
        });
        entries
    }

    /// Whether a command path names a node with anything registered beneath
    /// it. Used to validate alias targets.
    pub fn path_exists(&self, path: &str) -> bool {
        let words: Vec<String> = path.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            return false;
        }
        let tree = self.tree.read();
        tree.descend(&words)
            .is_some_and(|node| node.effective_min_level().is_some())
    }
}

/// One dispatched unit of execution. Binding and the action both run inside
/// it; failures never escape to the control loop.
async fn run_handler(
    bot: Arc<Bot>,
    handler: Arc<Handler>,
    remainder: String,
    message: Message,
    command: String,
) {
    let ctx = Context { bot, message };

    let (outcome, arguments) = match bind_args(&handler, &remainder) {
        Ok(args) => {
            let arguments = args.describe();
            (handler.action.run(&ctx, &args).await, arguments)
        }
        Err(e) => (Err(e), remainder.clone()),
    };

    match outcome {
        Ok(()) => {}
        Err(err @ (CommandError::User(_) | CommandError::Usage(_))) => {
            ctx.reply(err.to_string()).await;
        }
        Err(CommandError::Internal(e)) => {
            error!(
                command = %command,
                arguments = %arguments,
                error = %e,
                "command handler failed"
            );
            let apology = ctx.bot.config.bot.apology.clone();
            ctx.reply(apology).await;
        }
    }
}
