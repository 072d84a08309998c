//! Helper functions for CLI operations.
//!
//! Reading input, merging flags into the configuration, building the LLM
//! provider and mapping verdicts to exit codes.

use std::io::{self, Read};

use super::{
    convert::{convert_format, parse_provider},
    types::GlobalOptions
};
use crate::{
    cli::{Format, Provider},
    config::Config,
    error::{AppResult, config_error, file_read_error},
    guard::GuardVerdict,
    llm::LlmProvider,
    output::OutputOptions
};

/// Exit code of the `check` command: `0` accepted, `1` rejected.
///
/// # Example
///
/// ```
/// use sales_assistant::{app::check_exit_code, guard::SafetyGuard};
///
/// let guard = SafetyGuard::default();
/// assert_eq!(check_exit_code(&guard.validate("SELECT 1")), 0);
/// assert_eq!(check_exit_code(&guard.validate("DROP TABLE orders")), 1);
/// ```
pub fn check_exit_code(verdict: &GuardVerdict) -> i32 {
    if verdict.accepted { 0 } else { 1 }
}

/// Read SQL from the argument, or from stdin when it is `-`
pub fn read_sql_input(arg: &str) -> AppResult<String> {
    if arg == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| file_read_error("stdin", e))?;
        Ok(buffer)
    } else {
        Ok(arg.to_string())
    }
}

/// Load configuration from the explicit path or the default locations,
/// then apply command-line overrides
pub fn load_config(options: &GlobalOptions) -> AppResult<Config> {
    let mut config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?
    };
    apply_overrides(&mut config, options);
    Ok(config)
}

/// Command-line flags take precedence over every other source
pub fn apply_overrides(config: &mut Config, options: &GlobalOptions) {
    if let Some(url) = &options.database_url {
        config.database.url = url.clone();
    }
    if let Some(provider) = options.provider {
        config.llm.provider = Some(provider_name(provider).to_string());
    }
    if let Some(model) = &options.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(api_key) = &options.api_key {
        config.llm.api_key = Some(api_key.clone());
    }
    if let Some(url) = &options.ollama_url {
        config.llm.ollama_url = Some(url.clone());
    }
}

fn provider_name(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAI => "openai",
        Provider::Anthropic => "anthropic",
        Provider::Ollama => "ollama"
    }
}

/// Configured provider, Ollama when none is set
pub fn resolve_provider(config: &Config) -> AppResult<Provider> {
    match config.llm.provider.as_deref() {
        Some(name) => parse_provider(name),
        None => Ok(Provider::Ollama)
    }
}

/// Create output options from parameters
pub fn create_output_options(format: Format, no_color: bool, verbose: bool) -> OutputOptions {
    OutputOptions {
        format: convert_format(format),
        colored: !no_color,
        verbose
    }
}

/// Build the LLM provider from the merged configuration
pub fn build_llm_provider(config: &Config) -> AppResult<LlmProvider> {
    let provider = resolve_provider(config)?;
    let model = config
        .llm
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    match provider {
        Provider::OpenAI => {
            let key = config.llm.api_key.clone().ok_or_else(|| {
                config_error("API key required for OpenAI (use --api-key or LLM_API_KEY)")
            })?;
            Ok(LlmProvider::OpenAI {
                api_key: key,
                model
            })
        }
        Provider::Anthropic => {
            let key = config.llm.api_key.clone().ok_or_else(|| {
                config_error("API key required for Anthropic (use --api-key or LLM_API_KEY)")
            })?;
            Ok(LlmProvider::Anthropic {
                api_key: key,
                model
            })
        }
        Provider::Ollama => Ok(LlmProvider::Ollama {
            base_url: config
                .llm
                .ollama_url
                .clone()
                .unwrap_or_else(|| String::from("http://localhost:11434")),
            model
        })
    }
}
