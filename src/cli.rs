use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Sales Assistant - Ask questions about sales data in plain language
#[derive(Parser, Debug)]
#[command(name = "sales-assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Sales database URL (e.g. sqlite://nexora_sales.db)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// LLM provider to use
    #[arg(short, long, global = true, value_enum)]
    pub provider: Option<Provider>,

    /// Model name
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// API key for OpenAI or Anthropic
    #[arg(long, global = true, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Ollama base URL
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Show agent steps and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format
    },

    /// Start an interactive conversation
    Chat,

    /// Run a statement through the safety guard without executing it
    Check {
        /// SQL text (use - for stdin)
        sql: String,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format
    },

    /// List the tables the assistant may read
    Tables {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    #[value(alias = "openai")]
    OpenAI,
    Anthropic,
    Ollama
}

impl Provider {
    /// Get default model for provider
    pub fn default_model(&self) -> &str {
        match self {
            Self::OpenAI => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Ollama => "llama3.2"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
