//! Model value object representing an LLM model

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Available LLM models (Value Object)
///
/// A participant slot references one of these; the moderator pass
/// uses one as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    // Claude models
    ClaudeOpus45,
    ClaudeSonnet45,
    ClaudeHaiku45,
    // GPT models
    Gpt52,
    Gpt5Mini,
    Gpt41,
    // Gemini models
    Gemini3Pro,
    Gemini25Flash,
    // Other hosted models
    Grok4,
    DeepSeekR1,
    // Custom
    Custom(String),
}

impl Model {
    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::ClaudeOpus45 => "claude-opus-4.5",
            Model::ClaudeSonnet45 => "claude-sonnet-4.5",
            Model::ClaudeHaiku45 => "claude-haiku-4.5",
            Model::Gpt52 => "gpt-5.2",
            Model::Gpt5Mini => "gpt-5-mini",
            Model::Gpt41 => "gpt-4.1",
            Model::Gemini3Pro => "gemini-3-pro-preview",
            Model::Gemini25Flash => "gemini-2.5-flash",
            Model::Grok4 => "grok-4",
            Model::DeepSeekR1 => "deepseek-r1",
            Model::Custom(s) => s,
        }
    }

    /// Default council used when nothing is configured
    pub fn default_participants() -> Vec<Model> {
        vec![Model::ClaudeSonnet45, Model::Gpt52, Model::Gemini3Pro]
    }

    /// Default model for the moderator pass
    pub fn default_moderator() -> Model {
        Model::ClaudeOpus45
    }

    /// Provider prefix (`anthropic`, `openai`, ...) used for display grouping
    pub fn provider(&self) -> &str {
        match self {
            Model::ClaudeOpus45 | Model::ClaudeSonnet45 | Model::ClaudeHaiku45 => "anthropic",
            Model::Gpt52 | Model::Gpt5Mini | Model::Gpt41 => "openai",
            Model::Gemini3Pro | Model::Gemini25Flash => "google",
            Model::Grok4 => "xai",
            Model::DeepSeekR1 => "deepseek",
            Model::Custom(_) => "custom",
        }
    }

    /// Check if this is a Claude model
    pub fn is_claude(&self) -> bool {
        self.provider() == "anthropic"
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::ClaudeSonnet45
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "claude-opus-4.5" => Model::ClaudeOpus45,
            "claude-sonnet-4.5" => Model::ClaudeSonnet45,
            "claude-haiku-4.5" => Model::ClaudeHaiku45,
            "gpt-5.2" => Model::Gpt52,
            "gpt-5-mini" => Model::Gpt5Mini,
            "gpt-4.1" => Model::Gpt41,
            "gemini-3-pro-preview" => Model::Gemini3Pro,
            "gemini-2.5-flash" => Model::Gemini25Flash,
            "grok-4" => Model::Grok4,
            "deepseek-r1" => Model::DeepSeekR1,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let Ok(model) = s.parse::<Model>();
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_roundtrip() {
        for model in Model::default_participants() {
            let s = model.to_string();
            let parsed: Model = s.parse().unwrap();
            assert_eq!(model, parsed);
        }
    }

    #[test]
    fn test_custom_model() {
        let model: Model = "mistral-large".parse().unwrap();
        assert_eq!(model, Model::Custom("mistral-large".to_string()));
        assert_eq!(model.to_string(), "mistral-large");
        assert_eq!(model.provider(), "custom");
    }

    #[test]
    fn test_provider_detection() {
        assert!(Model::ClaudeHaiku45.is_claude());
        assert_eq!(Model::Gpt52.provider(), "openai");
        assert_eq!(Model::Gemini3Pro.provider(), "google");
        assert!(!Model::Grok4.is_claude());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Model::Gpt5Mini).unwrap();
        assert_eq!(json, "\"gpt-5-mini\"");
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Model::Gpt5Mini);
    }
}
