use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Ticketing API errors
    #[error("Ticket lookup failed: {0}")]
    Lookup(#[from] LookupError),

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failure to obtain the answer list from the ticketing API.
///
/// Kept apart from "no matching answer", which is an ordinary `Ok(None)`.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request to ticketing API timed out")]
    Timeout,

    #[error("could not reach ticketing API: {message}")]
    Transport { message: String },

    #[error("ticketing API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not parse ticketing API response: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else {
            LookupError::Transport {
                message: err.to_string(),
            }
        }
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;
