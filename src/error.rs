//! Errors crossing the dispatch boundary.
//!
//! Two kinds exist: user-facing command errors, rendered verbatim as a chat
//! reply, and everything else, which is logged with full context while the
//! user sees a generic apology. Handlers use `?` freely; store and other
//! unexpected failures convert into `Internal`.

use adjutant_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    /// A failure the invoking user can act on; relayed verbatim.
    #[error("{0}")]
    User(String),

    /// Argument binding failed; rendered as a usage hint.
    #[error("Syntax: `{0}`")]
    Usage(String),

    /// Anything unexpected. Logged with the command and its arguments; the
    /// user never sees the underlying message.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CommandError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type for command handlers.
pub type CommandResult = Result<(), CommandError>;
