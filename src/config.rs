//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.sales-assistant.toml` in current directory
//! 4. `~/.config/sales-assistant/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! provider = "openai"          # openai, anthropic, ollama
//! model = "gpt-4o"
//! api_key = "sk-..."           # or use LLM_API_KEY env var
//! ollama_url = "http://localhost:11434"
//! temperature = 0.0
//!
//! [retry]
//! max_retries = 3
//! initial_delay_ms = 1000
//!
//! [database]
//! url = "sqlite://nexora_sales.db"
//! schema = "main"
//! tables = ["customers", "orders", "products"]
//! statement_timeout_secs = 15
//! row_limit = 200
//!
//! [agent]
//! max_iterations = 15
//! history_limit = 10
//! assistant_name = "Nexora"
//! currency_prefix = "Rs."
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `LLM_API_KEY` | API key for OpenAI/Anthropic |
//! | `LLM_PROVIDER` | Provider name |
//! | `LLM_MODEL` | Model identifier |
//! | `OLLAMA_URL` | Ollama base URL |
//! | `DATABASE_URL` | Sales database connection string |

use std::{
    env, fs,
    path::{Path, PathBuf}
};

use serde::Deserialize;

use crate::error::{AppResult, config_error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm:      LlmConfig,
    #[serde(default)]
    pub retry:    RetryConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub agent:    AgentConfig
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider:             Option<String>,
    pub api_key:              Option<String>,
    pub model:                Option<String>,
    pub ollama_url:           Option<String>,
    pub temperature:          f32,
    pub max_tokens:           u32,
    pub request_timeout_secs: u64
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider:             None,
            api_key:              None,
            model:                None,
            ollama_url:           Some(String::from("http://localhost:11434")),
            temperature:          0.0,
            max_tokens:           4096,
            request_timeout_secs: 120
        }
    }
}

/// Retry configuration for LLM requests
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries:      u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms:     u64,
    pub backoff_factor:   f64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries:      3,
            initial_delay_ms: 1000,
            max_delay_ms:     30000,
            backoff_factor:   2.0
        }
    }
}

/// Sales database connection and scope
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url:                    String,
    /// Schema accepted as a table qualifier
    pub schema:                 String,
    /// Tables the assistant may read
    pub tables:                 Vec<String>,
    /// sqlparser dialect used by the guard
    pub dialect:                String,
    pub max_connections:        u32,
    pub acquire_timeout_secs:   u64,
    pub statement_timeout_secs: u64,
    pub row_limit:              usize,
    /// Sample rows included with each table schema
    pub sample_rows:            usize
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url:                    String::from("sqlite://nexora_sales.db"),
            schema:                 String::from("main"),
            tables:                 vec![
                String::from("customers"),
                String::from("orders"),
                String::from("products"),
            ],
            dialect:                String::from("sqlite"),
            max_connections:        5,
            acquire_timeout_secs:   5,
            statement_timeout_secs: 15,
            row_limit:              200,
            sample_rows:            3
        }
    }
}

/// Agent loop budget and persona
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model calls allowed per conversation turn
    pub max_iterations:  usize,
    /// Prior user/assistant turns kept in the transcript
    pub history_limit:   usize,
    pub assistant_name:  String,
    pub creator:         Option<String>,
    pub currency_prefix: String
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations:  15,
            history_limit:   10,
            assistant_name:  String::from("Nexora"),
            creator:         None,
            currency_prefix: String::from("Rs.")
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.sales-assistant.toml)
    /// 3. Config file in home directory
    ///    (~/.config/sales-assistant/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sales-assistant")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".sales-assistant.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        config.apply_env();
        Ok(config)
    }

    /// Load a single configuration file, then apply environment overrides
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse a single configuration file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    fn apply_env(&mut self) {
        if let Ok(api_key) = env::var("LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(provider) = env::var("LLM_PROVIDER") {
            self.llm.provider = Some(provider);
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = Some(model);
        }

        if let Ok(url) = env::var("OLLAMA_URL") {
            self.llm.ollama_url = Some(url);
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = url;
        }
    }
}
