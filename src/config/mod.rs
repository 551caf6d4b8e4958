//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `KAI_MENTOR` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use kai_mentor::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Coaching with {}", config.ai.model);
//! ```

mod ai;
mod coach;
mod error;
mod logging;

pub use ai::AiConfig;
pub use coach::CoachConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// AI provider configuration (OpenAI)
    #[serde(default)]
    pub ai: AiConfig,

    /// Coaching policy tunables
    #[serde(default)]
    pub coach: CoachConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `KAI_MENTOR` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `KAI_MENTOR__AI__OPENAI_API_KEY=sk-...` -> `ai.openai_api_key`
    /// - `KAI_MENTOR__COACH__CLARITY_THRESHOLD=0.6` -> `coach.clarity_threshold = 0.6`
    /// - `KAI_MENTOR__COACH__EXTRA_BANNED_PHRASES=запомни,обрати внимание` -> list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("KAI_MENTOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("coach.extra_banned_phrases"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.coach.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
