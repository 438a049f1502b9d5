//! File-level configuration.
//!
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! log_level = "debug"
//!
//! [model]
//! model = "llama-3.3-70b-versatile"
//! temperature = 1.0
//! max_tokens = 1024
//!
//! [conversation]
//! max_history = 10
//! request_timeout_secs = 30
//!
//! [personality]
//! name = "Bramble"
//! greeting = "Oh. It's you."
//!
//! [[world.objects]]
//! name = "Lamp01"
//! position = { x = 4.0, y = 0.0, z = 2.0 }
//! ```

use crate::agent::AgentConfig;
use crate::chat::ChatConfig;
use crate::dialogue::{DialogueConfig, ModelParams, MIN_HISTORY};
use crate::personality::PersonalityProfile;
use crate::world::WorldConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete configuration for one NPC scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcConfig {
    /// Fallback log filter when `RUST_LOG` is not set.
    pub log_level: String,
    pub model: ModelParams,
    pub conversation: DialogueConfig,
    pub agent: AgentConfig,
    pub chat: ChatConfig,
    pub personality: PersonalityProfile,
    pub world: WorldConfig,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            model: ModelParams::default(),
            conversation: DialogueConfig::default(),
            agent: AgentConfig::default(),
            chat: ChatConfig::default(),
            personality: PersonalityProfile::default(),
            world: WorldConfig::default(),
        }
    }
}

impl NpcConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        if config.log_level.is_empty() {
            config.log_level = "info".to_string();
        }
        config.personality = config.personality.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model.model = model.into();
        self
    }

    /// Set the personality of the NPC.
    pub fn with_personality(mut self, personality: PersonalityProfile) -> Self {
        self.personality = personality;
        self
    }

    /// Set the fallback log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid {
                field: "model.temperature",
                reason: format!("{} is outside [0, 2]", self.model.temperature),
            });
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::Invalid {
                field: "model.max_tokens",
                reason: "must be positive".to_string(),
            });
        }
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "model.model",
                reason: "must not be empty".to_string(),
            });
        }
        if self.conversation.max_history < MIN_HISTORY {
            return Err(ConfigError::Invalid {
                field: "conversation.max_history",
                reason: format!(
                    "{} must leave room for the system message and the player's line (at least {MIN_HISTORY})",
                    self.conversation.max_history
                ),
            });
        }
        if self.conversation.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "conversation.request_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.agent.move_speed <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "agent.move_speed",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = NpcConfig::from_toml_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.model.model, "llama-3.3-70b-versatile");
        assert_eq!(config.model.max_tokens, 1024);
        assert_eq!(config.conversation.max_history, 10);
        assert_eq!(config.personality.name, "Default");
        assert!(config.world.objects.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config = NpcConfig::from_toml_str(
            r#"
            log_level = "debug"

            [model]
            model = "llama-3.1-8b-instant"
            temperature = 0.5

            [conversation]
            max_history = 6

            [agent]
            follow_distance = 2.0

            [personality]
            name = "Bramble"
            helpfulness = 0.2

            [[world.objects]]
            name = "Lamp01"
            position = { x = 4.0, y = 0.0, z = 2.0 }

            [[world.waypoints]]
            x = 1.0
            y = 0.0
            z = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.model.model, "llama-3.1-8b-instant");
        assert_eq!(config.model.temperature, 0.5);
        assert_eq!(config.model.max_tokens, 1024);
        assert_eq!(config.conversation.max_history, 6);
        assert_eq!(config.agent.follow_distance, 2.0);
        assert_eq!(config.personality.helpfulness_level(), "hesitant to help");
        assert_eq!(config.world.objects[0].name, "Lamp01");
        assert_eq!(config.world.waypoints.len(), 1);
    }

    #[test]
    fn test_invalid_temperature() {
        let err = NpcConfig::from_toml_str("[model]\ntemperature = 2.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "model.temperature",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_history_rejected() {
        let err = NpcConfig::from_toml_str("[conversation]\nmax_history = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_history_without_room_for_player_rejected() {
        let err = NpcConfig::from_toml_str("[conversation]\nmax_history = 1").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "conversation.max_history", .. }
        ));
        assert!(NpcConfig::from_toml_str("[conversation]\nmax_history = 2").is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[personality]\ngreeting = \"Hi!\"").unwrap();

        let config = NpcConfig::load(file.path()).unwrap();
        assert_eq!(config.personality.greeting, "Hi!");
    }

    #[test]
    fn test_missing_file() {
        let err = NpcConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_builders() {
        let config = NpcConfig::default()
            .with_model("mixtral")
            .with_log_level("warn")
            .with_personality(PersonalityProfile::new("Pip"));
        assert_eq!(config.model.model, "mixtral");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.personality.name, "Pip");
    }
}
