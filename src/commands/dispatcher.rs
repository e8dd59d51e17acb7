//! The dispatch trie and argument binding.

use super::handler::{Args, Handler};
use crate::access::PrivilegeLevel;
use crate::error::CommandError;
use std::collections::HashMap;
use std::sync::Arc;

/// One level of the command-routing trie. Each node owns the handlers
/// registered at its path plus its named children. The root carries no
/// handlers.
#[derive(Default)]
pub struct DispatchNode {
    children: HashMap<String, DispatchNode>,
    handlers: Vec<Arc<Handler>>,
}

impl DispatchNode {
    pub fn root() -> Self {
        Self::default()
    }

    /// Create or reuse the node chain for a whitespace-separated path and
    /// append the handler to the terminal node.
    pub fn register(&mut self, path: &str, handler: Handler) {
        let mut node = self;
        for word in path.split_whitespace() {
            node = node.children.entry(word.to_string()).or_default();
        }
        node.handlers.push(Arc::new(handler));
    }

    pub fn child(&self, word: &str) -> Option<&DispatchNode> {
        self.children.get(word)
    }

    pub fn handlers(&self) -> &[Arc<Handler>] {
        &self.handlers
    }

    /// Walk a known-good path of words down from this node.
    pub fn descend(&self, path: &[String]) -> Option<&DispatchNode> {
        let mut node = self;
        for word in path {
            node = node.child(word)?;
        }
        Some(node)
    }

    /// The minimum privilege that reaches anything at or below this node:
    /// the minimum across its own handlers and every descendant. `None`
    /// means nothing is registered beneath it and the node is unreachable.
    pub fn effective_min_level(&self) -> Option<PrivilegeLevel> {
        let own = self.handlers.iter().map(|h| h.min_level).min();
        let descendants = self
            .children
            .values()
            .filter_map(|c| c.effective_min_level())
            .min();
        match (own, descendants) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (level, None) | (None, level) => level,
        }
    }

    /// Whether `level` may enter this node at all.
    pub fn reachable_at(&self, level: PrivilegeLevel) -> bool {
        self.effective_min_level().is_some_and(|min| level >= min)
    }

    /// Visit every node depth-first, with its path words.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&[&'a str], &'a DispatchNode)) {
        fn walk<'a>(
            node: &'a DispatchNode,
            path: &mut Vec<&'a str>,
            f: &mut impl FnMut(&[&'a str], &'a DispatchNode),
        ) {
            f(path, node);
            let mut words: Vec<&str> = node.children.keys().map(String::as_str).collect();
            words.sort_unstable();
            for word in words {
                path.push(word);
                walk(&node.children[word], path, f);
                path.pop();
            }
        }
        walk(self, &mut Vec::new(), f);
    }
}

/// Split off the first whitespace-delimited word.
pub(crate) fn split_first(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], text[at..].trim_start()),
        None => (text, ""),
    }
}

/// Split `text` into at most `max` tokens; the final token greedily absorbs
/// any leftover text, embedded whitespace included.
pub(crate) fn split_args(text: &str, max: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = text.trim();
    while !rest.is_empty() && tokens.len() + 1 < max {
        let (word, remainder) = split_first(rest);
        tokens.push(word.to_string());
        rest = remainder;
    }
    if !rest.is_empty() && tokens.len() < max {
        tokens.push(rest.to_string());
    }
    tokens
}

/// Bind the remaining text against a handler's parameter list. Missing
/// mandatory parameters are a usage failure carrying the handler's syntax.
pub(crate) fn bind_args(handler: &Handler, remainder: &str) -> Result<Args, CommandError> {
    let tokens = split_args(remainder, handler.params.len());
    let mut args = Args::default();
    for (index, param) in handler.params.iter().enumerate() {
        match (tokens.get(index), param.default) {
            (Some(token), _) => args.push(param.name, token.clone()),
            (None, Some(default)) => args.push(param.name, default.to_string()),
            (None, None) => return Err(CommandError::Usage(handler.syntax.clone())),
        }
    }
    Ok(args)
}
