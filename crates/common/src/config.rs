//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[validate(nested)]
    pub database: DatabaseConfig,
    /// Identity token verification.
    #[validate(nested)]
    pub auth: AuthConfig,
    /// Poll rules.
    #[serde(default)]
    #[validate(nested)]
    pub polls: PollsConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    #[validate(length(min = 1, message = "database.url must be set"))]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    #[validate(range(min = 1, message = "database.max_connections must be at least 1"))]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Verification settings for tokens issued by the identity provider.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider.
    #[validate(length(min = 1, message = "auth.jwt_secret must not be empty"))]
    pub jwt_secret: String,
    /// Expected `iss` claim, if the provider sets one.
    #[serde(default)]
    pub jwt_issuer: Option<String>,
}

/// Poll policy and validation limits.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PollsConfig {
    /// Reject anonymous votes.
    #[serde(default)]
    pub require_auth_to_vote: bool,
    /// Maximum number of options per poll.
    #[serde(default = "default_max_options")]
    #[validate(range(min = 2, message = "polls.max_options must allow at least 2 options"))]
    pub max_options: usize,
    /// Maximum length of a single option, in characters.
    #[serde(default = "default_max_option_length")]
    #[validate(range(min = 1, message = "polls.max_option_length must be at least 1"))]
    pub max_option_length: usize,
    /// Maximum length of the question, in characters.
    #[serde(default = "default_max_question_length")]
    #[validate(range(min = 1, message = "polls.max_question_length must be at least 1"))]
    pub max_question_length: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_max_options() -> usize {
    10
}

const fn default_max_option_length() -> usize {
    100
}

const fn default_max_question_length() -> usize {
    512
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PollsConfig {
    fn default() -> Self {
        Self {
            require_auth_to_vote: false,
            max_options: default_max_options(),
            max_option_length: default_max_option_length(),
            max_question_length: default_max_question_length(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, only to populate the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `POLLBOX_ENV`)
    /// 4. Environment variables with `POLLBOX__` prefix
    pub fn load() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let env = std::env::var("POLLBOX_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("POLLBOX")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::checked(config.try_deserialize()?)
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("POLLBOX")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::checked(config.try_deserialize()?)
    }

    /// Reject values that parse but cannot work, such as an empty secret.
    fn checked(config: Self) -> AppResult<Self> {
        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }
}
