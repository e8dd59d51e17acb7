//! adjutant - chat-bot core.
//!
//! Two subsystems everything else leans on: a hierarchical,
//! permission-gated command dispatcher ([`commands`]) and a declarative
//! persistence layer over [`adjutant_store`] ([`db`]), plus the privilege
//! resolver ([`access`]) and the in-memory platform view ([`platform`]) they
//! consult. The platform gateway itself is an external collaborator: it
//! feeds [`platform::Event`]s in and drains [`platform::Outbound`] replies.

pub mod access;
pub mod bot;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod platform;
