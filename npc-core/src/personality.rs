//! NPC personality profiles.
//!
//! A profile controls the tone of an NPC and renders the system prompt
//! that opens every conversation with it.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Tone and greeting configuration for one NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityProfile {
    pub name: String,
    pub greeting: String,
    pub description: String,
    pub bubble_color: Color,
    /// Willingness to help, in `[0, 1]`.
    pub helpfulness: f32,
    /// Energy of the replies, in `[0, 1]`.
    pub enthusiasm: f32,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            greeting: "Hello there!".to_string(),
            description: "A helpful AI assistant.".to_string(),
            bubble_color: Color::WHITE,
            helpfulness: 0.7,
            enthusiasm: 0.7,
        }
    }
}

impl PersonalityProfile {
    /// Create a profile with default traits and the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_bubble_color(mut self, color: Color) -> Self {
        self.bubble_color = color;
        self
    }

    pub fn with_helpfulness(mut self, helpfulness: f32) -> Self {
        self.helpfulness = clamp_trait(helpfulness, 0.7);
        self
    }

    pub fn with_enthusiasm(mut self, enthusiasm: f32) -> Self {
        self.enthusiasm = clamp_trait(enthusiasm, 0.7);
        self
    }

    /// Parse a profile from TOML. Missing fields take their defaults and
    /// trait values are clamped into `[0, 1]`.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let profile: Self = toml::from_str(text)?;
        Ok(profile.normalized())
    }

    /// Load a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.helpfulness = clamp_trait(self.helpfulness, 0.7);
        self.enthusiasm = clamp_trait(self.enthusiasm, 0.7);
        self
    }

    pub fn enthusiasm_level(&self) -> &'static str {
        if self.enthusiasm > 0.7 {
            "very enthusiastic"
        } else if self.enthusiasm > 0.4 {
            "moderately enthusiastic"
        } else {
            "reluctant"
        }
    }

    pub fn helpfulness_level(&self) -> &'static str {
        if self.helpfulness > 0.7 {
            "eager to help"
        } else if self.helpfulness > 0.4 {
            "willing to help"
        } else {
            "hesitant to help"
        }
    }

    /// Render the system prompt that seeds every conversation.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {} and {} AI assistant in a game. {} \
             Use the toggle_follow function when the player asks you to follow. \
             Use the move_to_object function when asked to go to a specific object. \
             Keep responses short (under 50 characters) and match your personality. \
             Your first greeting should be: {}",
            self.enthusiasm_level(),
            self.helpfulness_level(),
            self.description,
            self.greeting
        )
    }
}

fn clamp_trait(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}
