use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BanmaiError, Result};

/// Top-level configuration for the banmai chatbot.
///
/// Loaded from a TOML file supplied by the hosting process. Each section
/// corresponds to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BanmaiConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
}

impl BanmaiConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BanmaiConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| BanmaiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Gemini completion-service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key. Empty means the completion service is not configured.
    pub api_key: String,
    /// Model name passed to the generateContent endpoint.
    pub model: String,
    /// API base URL, overridable for testing.
    pub api_base: String,
    /// Request timeout in seconds. The completion call is the dominant
    /// latency source and must never hang indefinitely.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Knowledge-base settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory scanned (non-recursively) for spreadsheet files.
    pub data_dir: String,
    /// Minimum similarity score for a direct match.
    pub match_threshold: f64,
    /// Score bonus when an entry keyword appears in the expanded message.
    pub keyword_bonus: f64,
    /// Extra abbreviation expansions merged over the built-in table at
    /// startup.
    pub abbreviations: HashMap<String, String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            match_threshold: 0.5,
            keyword_bonus: 0.3,
            abbreviations: HashMap::new(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum turns kept per user; oldest are dropped first.
    pub history_cap: usize,
    /// Turns of history included in each completion prompt.
    pub context_turns: usize,
    /// Maximum knowledge entries per category in the prompt context dump.
    pub category_cap: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_cap: 20,
            context_turns: 10,
            category_cap: 50,
        }
    }
}

/// Facebook Messenger delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Page access token. Empty means outbound delivery is not configured.
    pub page_token: String,
    /// Graph API base URL, overridable for testing.
    pub api_base: String,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            page_token: String::new(),
            api_base: "https://graph.facebook.com/v18.0".to_string(),
        }
    }
}
