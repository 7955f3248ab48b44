//! Configuration system for ai-cli
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/ai-cli/config.json
//! 3. Default values
//!
//! # Examples
//!
//! ```
//! use ai_cli::config::{AppConfig, ModelProvider};
//!
//! let mut config = AppConfig::default();
//! config.provider = ModelProvider::Ollama;
//! config.ollama.model = "codellama".to_string();
//! config.validate().unwrap();
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - AI_CLI_PROVIDER
//! - AI_CLI_MODEL (model of the active provider)
//! - AI_CLI_OLLAMA_URL
//! - OPENAI_API_KEY (resolved on demand)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheConfig;

/// Upper bound for `cache.ttl_secs`
pub const MAX_TTL_SECS: u64 = 365 * 24 * 3600;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Ollama,
    OpenAI,
    Anthropic,
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(ConfigError::ValidationError(format!(
                "Unknown provider: {}",
                s
            ))),
        }
    }
}

/// Connection and sampling settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the API
    pub url: String,

    /// Model name
    pub model: String,

    /// API key (can be environment variable name like "OPENAI_API_KEY")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::ollama()
    }
}

impl ModelConfig {
    /// Local Ollama defaults
    pub fn ollama() -> Self {
        Self {
            url: default_ollama_url(),
            model: "codellama".to_string(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: Some(1000),
        }
    }

    /// Hosted OpenAI defaults; the key is read from `OPENAI_API_KEY`
    pub fn openai() -> Self {
        Self {
            url: default_openai_url(),
            model: "gpt-4".to_string(),
            api_key: Some("OPENAI_API_KEY".to_string()),
            temperature: default_temperature(),
            max_tokens: Some(1000),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "URL cannot be empty".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationError(
                "Model name cannot be empty".to_string(),
            ));
        }

        if self.max_tokens == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve API key from environment variable if needed
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.as_ref().and_then(|key| {
            // If the key looks like an env var name, try to resolve it
            if key.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                std::env::var(key).ok().filter(|value| !value.is_empty())
            } else {
                Some(key.clone())
            }
        })
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend used when the cache and dataset both miss
    #[serde(default)]
    pub provider: ModelProvider,

    #[serde(default = "ModelConfig::ollama")]
    pub ollama: ModelConfig,

    #[serde(default = "ModelConfig::openai")]
    pub openai: ModelConfig,

    /// Deadline for a single backend call
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout_secs: u64,

    /// Deadline for executing a generated command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default)]
    pub cache: CacheConfig,

    /// CSV catalogs of known commands
    #[serde(default = "default_dataset_files")]
    pub dataset_files: Vec<PathBuf>,
}

fn default_backend_timeout() -> u64 {
    60
}

fn default_command_timeout() -> u64 {
    30
}

fn default_dataset_files() -> Vec<PathBuf> {
    [
        "data/cmd_commands.csv",
        "data/linux_commands.csv",
        "data/macos_commands.csv",
        "data/vbscript_commands.csv",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            ollama: ModelConfig::ollama(),
            openai: ModelConfig::openai(),
            backend_timeout_secs: default_backend_timeout(),
            command_timeout_secs: default_command_timeout(),
            cache: CacheConfig::default(),
            dataset_files: default_dataset_files(),
        }
    }
}

impl AppConfig {
    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/ai-cli/config.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_stored(explicit_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Same lookup as [`AppConfig::load`] but without environment overrides
    /// or validation, so the stored file can be edited and written back.
    pub fn load_stored(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::read_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::read_file(&config_path);
            }
        }

        tracing::info!("Using default configuration");
        Ok(Self::default())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("AI_CLI_PROVIDER") {
            match provider.parse() {
                Ok(provider) => self.provider = provider,
                Err(e) => tracing::warn!("Ignoring AI_CLI_PROVIDER: {}", e),
            }
        }

        if let Ok(url) = std::env::var("AI_CLI_OLLAMA_URL") {
            self.ollama.url = url;
        }

        if let Ok(model) = std::env::var("AI_CLI_MODEL") {
            self.active_model_mut().model = model;
        }

        // API keys are resolved on-demand via resolve_api_key()
    }

    /// Settings of the selected provider
    pub fn active_model(&self) -> &ModelConfig {
        self.model_for(self.provider)
    }

    pub fn active_model_mut(&mut self) -> &mut ModelConfig {
        match self.provider {
            ModelProvider::Ollama => &mut self.ollama,
            ModelProvider::OpenAI | ModelProvider::Anthropic => &mut self.openai,
        }
    }

    /// Anthropic has no settings of its own yet and shares the hosted block
    pub fn model_for(&self, provider: ModelProvider) -> &ModelConfig {
        match provider {
            ModelProvider::Ollama => &self.ollama,
            ModelProvider::OpenAI | ModelProvider::Anthropic => &self.openai,
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.openai.validate()?;

        if self.backend_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "command_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.cache.shards == 0 || self.cache.shard_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache shards and shard_capacity must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl_secs == 0 || self.cache.reap_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache ttl_secs and reap_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "cache ttl_secs must be at most {} (one year), got {}",
                MAX_TTL_SECS, self.cache.ttl_secs
            )));
        }

        if !(0.0..=1.0).contains(&self.cache.similarity_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "similarity_threshold must be between 0.0 and 1.0, got {}",
                self.cache.similarity_threshold
            )));
        }

        if self.provider == ModelProvider::OpenAI && self.openai.resolve_api_key().is_none() {
            return Err(ConfigError::ValidationError(
                "API key required for openai provider (set OPENAI_API_KEY or run set-api-key)"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ai-cli"))
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.json"))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
