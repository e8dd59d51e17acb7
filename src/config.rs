//! Configuration loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration, loaded from a TOML file at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Platform user id of the bot itself. Mentions of this id mark a
    /// message as a command in shared channels.
    pub user_id: i64,

    /// Principals resolved to the owner level unconditionally.
    #[serde(default)]
    pub owners: Vec<i64>,

    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Reply sent when a handler fails unexpectedly.
    #[serde(default = "default_apology")]
    pub apology: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_bot_name() -> String {
    "adjutant".to_string()
}

fn default_db_path() -> String {
    "adjutant.db".to_string()
}

fn default_apology() -> String {
    "Oh no, something went wrong trying to complete this command. Please tell \
     the owner of this bot what you entered and roughly when this happened, \
     and it will get fixed as soon as possible."
        .to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.user_id <= 0 {
            return Err(ConfigError::Invalid(
                "bot.user_id must be a positive platform id".to_string(),
            ));
        }
        if self.bot.name.is_empty() {
            return Err(ConfigError::Invalid("bot.name must not be empty".to_string()));
        }
        Ok(())
    }
}
