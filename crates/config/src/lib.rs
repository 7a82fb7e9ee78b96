//! Configuration management for Chartwise
//!
//! Loads and saves the Superset connection, model backend and agent budget
//! from `~/.chartwise/config.json`, with environment overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub const DEFAULT_MAX_ROUNDS: u32 = 5;
pub const DEFAULT_EXHAUSTION_MESSAGE: &str = "Agent loop limit reached without final answer.";

/// Superset connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupersetConfig {
    #[serde(default = "default_superset_url")]
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_auth_provider")]
    pub auth_provider: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SupersetConfig {
    fn default() -> Self {
        Self {
            base_url: default_superset_url(),
            username: String::new(),
            password: String::new(),
            auth_provider: default_auth_provider(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_superset_url() -> String {
    "http://localhost:8088".to_string()
}

fn default_auth_provider() -> String {
    "db".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Which chat-completion wire protocol to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Ollama,
    Openai,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Ollama => write!(f, "ollama"),
            Backend::Openai => write!(f, "openai"),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            name: default_model_name(),
            api_base: None,
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_model_name() -> String {
    "llama3".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Agent loop budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_exhaustion_message")]
    pub exhaustion_message: String,
    /// Replaces the built-in analyst prompt when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            exhaustion_message: default_exhaustion_message(),
            system_prompt: None,
        }
    }
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_exhaustion_message() -> String {
    DEFAULT_EXHAUSTION_MESSAGE.to_string()
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub superset: SupersetConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub async fn load() -> Result<Self> {
        let path = config_path();
        let mut config = Self::load_from(&path).await?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SUPERSET_BASE_URL") {
            debug!("SUPERSET_BASE_URL overrides superset.base_url");
            self.superset.base_url = url;
        }
        if let Some(user) = get("SUPERSET_USERNAME") {
            self.superset.username = user;
        }
        if let Some(password) = get("SUPERSET_PASSWORD") {
            self.superset.password = password;
        }
        if let Some(model) = get("CHARTWISE_MODEL") {
            self.model.name = model;
        }

        match self.model.backend {
            Backend::Ollama => {
                if let Some(host) = get("OLLAMA_BASE_URL") {
                    debug!("OLLAMA_BASE_URL overrides model.api_base");
                    self.model.api_base = Some(host);
                }
            }
            Backend::Openai => {
                if self.model.api_key.is_empty() {
                    if let Some(key) = get("OPENAI_API_KEY") {
                        self.model.api_key = key;
                    }
                }
            }
        }
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_rounds == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_rounds must be at least 1".to_string(),
            ));
        }
        if self.superset.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "superset.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Superset base URL without a trailing slash
    pub fn superset_url(&self) -> String {
        self.superset.base_url.trim_end_matches('/').to_string()
    }

    pub fn has_credentials(&self) -> bool {
        !self.superset.username.is_empty() && !self.superset.password.is_empty()
    }

    pub fn model_name(&self) -> String {
        self.model.name.clone()
    }

    pub fn max_rounds(&self) -> u32 {
        self.agent.max_rounds
    }
}

/// Write the default config file unless one already exists, then load it
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("Config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("Config written to {:?}", config_path);
    }

    Config::load().await
}
