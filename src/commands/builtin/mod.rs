//! Built-in command handlers registered on every bot.

mod alias_admin;
mod general;
mod user_admin;

use super::Commands;

pub(super) fn register_all(commands: &Commands) {
    general::register(commands);
    user_admin::register(commands);
    alias_admin::register(commands);
}
