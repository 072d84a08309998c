//! Application types for CLI commands.

use std::path::PathBuf;

use crate::cli::Provider;

/// Options shared by every command, taken from global flags.
///
/// Every field left unset falls back to the loaded configuration.
///
/// # Example
///
/// ```
/// use sales_assistant::{app::GlobalOptions, cli::Provider};
///
/// let options = GlobalOptions {
///     provider: Some(Provider::Ollama),
///     no_color: true,
///     ..Default::default()
/// };
/// assert!(options.api_key.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path:  Option<PathBuf>,
    pub database_url: Option<String>,
    pub provider:     Option<Provider>,
    pub model:        Option<String>,
    pub api_key:      Option<String>,
    pub ollama_url:   Option<String>,
    pub no_color:     bool,
    pub verbose:      bool
}

/// Rendered output of a command plus its process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub output:    String
}

impl CommandOutput {
    pub fn success(output: String) -> Self {
        Self {
            exit_code: 0,
            output
        }
    }
}
