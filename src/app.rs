//! Application logic for the Sales Assistant CLI.
//!
//! Command logic lives here rather than in the entry point so it can be
//! tested without spawning the binary.
//!
//! # Modules
//!
//! - `commands` - guard checks, table listing and agent conversations
//! - `convert` - CLI and configuration values to internal types
//! - `helpers` - configuration merging, provider building, exit codes
//! - `types` - shared option and output types

mod commands;
mod convert;
mod helpers;
mod types;

pub use commands::{
    build_agent, build_executor, run_ask, run_chat, run_check, run_tables
};
pub use convert::{convert_format, parse_dialect, parse_provider};
pub use helpers::{
    apply_overrides, build_llm_provider, check_exit_code, create_output_options, load_config,
    read_sql_input, resolve_provider
};
pub use types::{CommandOutput, GlobalOptions};

use crate::{
    cli::{Cli, Commands},
    error::AppResult
};

impl From<&Cli> for GlobalOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            config_path:  cli.config.clone(),
            database_url: cli.database_url.clone(),
            provider:     cli.provider,
            model:        cli.model.clone(),
            api_key:      cli.api_key.clone(),
            ollama_url:   cli.ollama_url.clone(),
            no_color:     cli.no_color,
            verbose:      cli.verbose
        }
    }
}

/// Run the parsed command line and return the process exit code
pub async fn run(cli: Cli) -> AppResult<i32> {
    let options = GlobalOptions::from(&cli);
    let config = load_config(&options)?;
    let output = match cli.command {
        Commands::Check {
            sql,
            output_format
        } => run_check(&sql, output_format, &config, &options)?,
        Commands::Tables {
            output_format
        } => run_tables(output_format, &config, &options).await?,
        Commands::Ask {
            question,
            output_format
        } => run_ask(&question, output_format, &config, &options).await?,
        Commands::Chat => return run_chat(&config, &options).await
    };
    println!("{}", output.output);
    Ok(output.exit_code)
}
