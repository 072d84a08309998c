//! Conversions from CLI and configuration values to internal types.

use clap::ValueEnum;

use crate::{
    cli::{Format, Provider},
    error::{AppResult, config_error},
    output::OutputFormat,
    statement::SqlDialect
};

/// Converts a CLI format to the internal output format.
///
/// # Example
///
/// ```
/// use sales_assistant::{app::convert_format, cli::Format, output::OutputFormat};
///
/// assert_eq!(convert_format(Format::Yaml), OutputFormat::Yaml);
/// ```
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Parses a provider name from configuration (`openai`, `anthropic`,
/// `ollama`), ignoring case.
pub fn parse_provider(name: &str) -> AppResult<Provider> {
    Provider::from_str(name.trim(), true)
        .map_err(|_| config_error(format!("Unknown LLM provider '{}'", name)))
}

/// Parses the configured SQL dialect
pub fn parse_dialect(name: &str) -> AppResult<SqlDialect> {
    name.parse::<SqlDialect>().map_err(config_error)
}
