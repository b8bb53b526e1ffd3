//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::time::Duration;

/// Main engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub polling: PollingConfig,
    pub stories: StoryConfig,
    pub messaging: MessagingConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Background polling intervals
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Message pull interval in seconds (default: 5)
    pub message_interval_seconds: u64,
    /// Known-user reload interval in seconds (default: 30)
    pub user_reload_interval_seconds: u64,
}

impl PollingConfig {
    pub fn message_interval(&self) -> Duration {
        Duration::from_secs(self.message_interval_seconds)
    }

    pub fn user_reload_interval(&self) -> Duration {
        Duration::from_secs(self.user_reload_interval_seconds)
    }
}

/// Story playback configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoryConfig {
    /// Seconds an image story plays; constant across all image stories
    /// (default: 7)
    pub image_duration_seconds: u64,
    /// Playback progress tick in milliseconds (default: 100)
    pub tick_milliseconds: u64,
}

impl StoryConfig {
    pub fn image_duration(&self) -> Duration {
        Duration::from_secs(self.image_duration_seconds)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_milliseconds)
    }
}

/// Messaging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// How far back a failed send may retract its optimistic echo,
    /// in seconds (default: 30)
    pub echo_retract_window_seconds: i64,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Profile cache TTL in seconds (default: 86400)
    pub profile_ttl_seconds: u64,
}

impl CacheConfig {
    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl EngineConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (LAGOON_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::EngineError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("polling.message_interval_seconds", 5)?
            .set_default("polling.user_reload_interval_seconds", 30)?
            .set_default("stories.image_duration_seconds", 7)?
            .set_default("stories.tick_milliseconds", 100)?
            .set_default("messaging.echo_retract_window_seconds", 30)?
            .set_default("cache.profile_ttl_seconds", 86400)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (LAGOON_*)
            .add_source(
                Environment::with_prefix("LAGOON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::EngineError::Config(e.to_string()))?;

        let engine_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::EngineError::Config(e.to_string()))?;
        engine_config.validate()?;
        Ok(engine_config)
    }

    fn validate(&self) -> Result<(), crate::error::EngineError> {
        if self.polling.message_interval_seconds == 0 {
            return Err(crate::error::EngineError::Config(
                "polling.message_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.polling.user_reload_interval_seconds == 0 {
            return Err(crate::error::EngineError::Config(
                "polling.user_reload_interval_seconds must be greater than 0".to_string(),
            ));
        }

        // Image stories must play a constant, human-scale duration.
        if !(5..=15).contains(&self.stories.image_duration_seconds) {
            return Err(crate::error::EngineError::Config(
                "stories.image_duration_seconds must be between 5 and 15".to_string(),
            ));
        }

        if self.stories.tick_milliseconds == 0
            || self.stories.tick_milliseconds > self.stories.image_duration_seconds * 1000
        {
            return Err(crate::error::EngineError::Config(
                "stories.tick_milliseconds must be positive and shorter than the image duration"
                    .to_string(),
            ));
        }

        if self.messaging.echo_retract_window_seconds <= 0 {
            return Err(crate::error::EngineError::Config(
                "messaging.echo_retract_window_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> EngineConfig {
        EngineConfig {
            polling: PollingConfig {
                message_interval_seconds: 5,
                user_reload_interval_seconds: 30,
            },
            stories: StoryConfig {
                image_duration_seconds: 7,
                tick_milliseconds: 100,
            },
            messaging: MessagingConfig {
                echo_retract_window_seconds: 30,
            },
            cache: CacheConfig {
                profile_ttl_seconds: 86400,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = valid_config();
        config.polling.message_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_image_duration_is_rejected() {
        let mut config = valid_config();
        config.stories.image_duration_seconds = 35;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tick_longer_than_image_duration_is_rejected() {
        let mut config = valid_config();
        config.stories.tick_milliseconds = 20_000;
        assert!(config.validate().is_err());
    }
}
