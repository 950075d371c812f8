use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GrocerError, Result};

/// Top-level configuration for the grocery assistant.
///
/// Loaded from `grocer.toml` by default. Every section is optional; missing
/// sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrocerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl GrocerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GrocerConfig = toml::from_str(&content)?;
        info!(path = %path.display(), "Configuration loaded");
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
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| GrocerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP listen port.
    pub port: u16,
    /// Directory holding the catalog `*.json` files.
    pub catalog_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 5000,
            catalog_dir: "data".to_string(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// When false every turn is rejected.
    pub enabled: bool,
    /// Maximum number of products returned per turn.
    pub result_limit: usize,
    /// Maximum message length in characters.
    pub max_message_length: usize,
    /// Whole-message commands that clear the conversation.
    pub reset_keywords: Vec<String>,
    /// Transcript messages kept in memory; the oldest are dropped first.
    pub max_history: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            result_limit: 3,
            max_message_length: 2000,
            reset_keywords: vec![
                "reset".to_string(),
                "clear".to_string(),
                "start over".to_string(),
                "new search".to_string(),
            ],
            max_history: 200,
        }
    }
}

/// Which inference oracle translates utterances into filter suggestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    /// Offline vocabulary matcher built from the catalog.
    #[default]
    Rules,
    /// OpenAI-compatible chat-completions endpoint.
    Llm,
}

/// Inference oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Path of the chat-completions endpoint, appended to `api_base`.
    pub path: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::Rules,
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            path: "/chat/completions".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.1,
            max_tokens: 512,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl OracleConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// Blank values count as unset.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Full endpoint URL with exactly one slash between base and path.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Requests allowed per second across all clients. 0 disables limiting.
    pub rate_limit_per_sec: u64,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_sec: 100,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_body_bytes: 64 * 1024,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
