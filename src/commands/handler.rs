//! Handler descriptors and the action trait.
//!
//! A handler is registered with an explicit ordered parameter list; nothing
//! is ever introspected from the action itself. The usage syntax shown on
//! binding failures is derived from the command path plus these descriptors.

use crate::access::PrivilegeLevel;
use crate::bot::Bot;
use crate::error::CommandResult;
use crate::platform::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// Invocation context handed to every action.
#[derive(Clone)]
pub struct Context {
    pub bot: Arc<Bot>,
    pub message: Message,
}

impl Context {
    /// Queue a reply into the channel the command came from.
    pub async fn reply(&self, text: impl Into<String>) {
        self.bot.send(self.message.channel, text).await;
    }
}

/// The work a handler performs.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, ctx: &Context, args: &Args) -> CommandResult;
}

/// One declared parameter of a handler.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: &'static str,
    /// `None` marks a mandatory parameter. `Some("")` is optional with an
    /// empty default; any other value is the literal default.
    pub default: Option<&'static str>,
}

impl Param {
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub fn optional(name: &'static str) -> Self {
        Self {
            name,
            default: Some(""),
        }
    }

    pub fn defaulted(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }

    pub(crate) fn syntax(&self) -> String {
        match self.default {
            None => format!("<{}>", self.name),
            Some("") => format!("<{} (optional)>", self.name),
            Some(default) => format!("<{} (default: \"{default}\")>", self.name),
        }
    }
}

/// Arguments bound against a handler's parameter list: one value per
/// declared parameter, defaults filled in.
#[derive(Debug, Clone, Default)]
pub struct Args(Vec<(&'static str, String)>);

impl Args {
    pub(crate) fn push(&mut self, name: &'static str, value: String) {
        self.0.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The bound value, or `""` for a name that was never declared.
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Render for failure logs.
    pub(crate) fn describe(&self) -> String {
        self.0
            .iter()
            .map(|(n, v)| format!("{n}={v:?}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A registered handler: the action plus its gate and descriptor.
pub struct Handler {
    pub action: Arc<dyn Action>,
    pub min_level: PrivilegeLevel,
    pub description: String,
    pub syntax: String,
    pub params: Vec<Param>,
}

/// Everything `register` needs for one handler.
pub struct HandlerSpec {
    pub path: &'static str,
    pub action: Arc<dyn Action>,
    pub min_level: PrivilegeLevel,
    pub description: &'static str,
    pub params: Vec<Param>,
}

impl HandlerSpec {
    pub fn new(path: &'static str, action: Arc<dyn Action>) -> Self {
        Self {
            path,
            action,
            min_level: PrivilegeLevel::GuildBotAdmin,
            description: "",
            params: Vec::new(),
        }
    }

    pub fn level(mut self, level: PrivilegeLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub(crate) fn into_handler(self) -> Handler {
        let mut syntax = self.path.to_string();
        for param in &self.params {
            syntax.push(' ');
            syntax.push_str(&param.syntax());
        }
        Handler {
            action: self.action,
            min_level: self.min_level,
            description: self.description.to_string(),
            syntax,
            params: self.params,
        }
    }
}
