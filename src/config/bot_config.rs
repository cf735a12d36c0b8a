use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::tito::MatchPolicy;

pub const DEFAULT_TITO_API_BASE: &str = "https://api.tito.io";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "tito-gatekeeper/",
    env!("CARGO_PKG_VERSION"),
    " (Discord access bot)"
);
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment variables that take precedence over the tokens in the file
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";
pub const TITO_TOKEN_ENV: &str = "TITO_TOKEN";

/// Bot configuration
/// Loaded once at startup from a JSON document, read-only afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    #[serde(default)]
    pub discord: DiscordConfig,

    pub tito: TitoConfig,

    /// Guild the bot verifies members in
    pub guild_id: u64,

    /// Role granted on successful verification
    pub role_id: u64,

    /// Channel `/button` posts the access panel into
    pub channel_id: u64,

    /// Shown in the access panel text
    #[serde(default = "default_event_name")]
    pub event_name: String,

    /// Linked from the access panel when set
    #[serde(default)]
    pub code_of_conduct_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token, may instead come from `DISCORD_TOKEN`
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TitoConfig {
    pub account_slug: String,
    pub event_slug: String,
    /// Slug of the ticket question asking for the Discord username
    pub question_slug: String,

    /// API token, may instead come from `TITO_TOKEN`
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub match_policy: MatchPolicy,
}

fn default_event_name() -> String {
    "the event".to_string()
}

fn default_api_base() -> String {
    DEFAULT_TITO_API_BASE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl BotConfig {
    /// Load from a JSON file, apply token overrides from the environment and validate
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let mut config = Self::parse(path, &content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn parse(path: &str, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })
    }

    /// Replace tokens with values from the environment when present and non-empty
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(DISCORD_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.discord.token = token;
        }
        if let Some(token) = lookup(TITO_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.tito.token = token;
        }
    }

    /// Reject configurations that would only fail later, at first use
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("discord.token", self.discord.token.as_str()),
            ("tito.account_slug", self.tito.account_slug.as_str()),
            ("tito.event_slug", self.tito.event_slug.as_str()),
            ("tito.question_slug", self.tito.question_slug.as_str()),
            ("tito.token", self.tito.token.as_str()),
            ("tito.api_base", self.tito.api_base.as_str()),
            ("tito.user_agent", self.tito.user_agent.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(BotError::ConfigValidation {
                    message: format!("'{}' is missing or empty", key),
                });
            }
        }

        // Snowflakes are never zero, and serenity's id constructors panic on it
        for (key, value) in [
            ("guild_id", self.guild_id),
            ("role_id", self.role_id),
            ("channel_id", self.channel_id),
        ] {
            if value == 0 {
                return Err(BotError::ConfigValidation {
                    message: format!("'{}' must be a non-zero Discord id", key),
                });
            }
        }

        if self.tito.timeout_secs == 0 {
            return Err(BotError::ConfigValidation {
                message: "'tito.timeout_secs' must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn guild_id(&self) -> GuildId {
        GuildId::new(self.guild_id)
    }

    pub fn role_id(&self) -> RoleId {
        RoleId::new(self.role_id)
    }

    pub fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.channel_id)
    }
}
