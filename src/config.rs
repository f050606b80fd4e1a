use crate::error::{config::ConfigError, AppError};

const DISCORD_AUTH_URL: &str = "https://discord.com/oauth2/authorize";
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

pub struct Config {
    pub discord_bot_token: String,

    pub discord_client_id: String,
    pub discord_client_secret: String,
    pub discord_redirect_url: String,

    /// Discord user id allowed to manage the denylist.
    pub owner_id: u64,

    pub discord_auth_url: String,
    pub discord_api_base: String,

    /// Directory holding the JSON state documents.
    pub data_dir: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            discord_bot_token: require("DISCORD_BOT_TOKEN")?,
            discord_client_id: require("DISCORD_CLIENT_ID")?,
            discord_client_secret: require("DISCORD_CLIENT_SECRET")?,
            discord_redirect_url: require("DISCORD_REDIRECT_URL")?,
            owner_id: parse_u64("DISCORD_OWNER_ID", require("DISCORD_OWNER_ID")?)?,
            discord_auth_url: DISCORD_AUTH_URL.to_string(),
            discord_api_base: std::env::var("DISCORD_API_BASE")
                .unwrap_or_else(|_| DISCORD_API_BASE.to_string()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}

fn require(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(name: &str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvVar {
        name: name.to_string(),
        value,
    })
}
