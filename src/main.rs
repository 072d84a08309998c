//! # Sales Assistant
//!
//! Ask questions about sales data in plain language.
//!
//! A language model answers each question by calling SQL tools against the
//! sales database. Every statement it proposes passes a safety guard first:
//! exactly one parseable, read-only `SELECT` over the allowed tables, with
//! no data-changing keywords anywhere in the text. Rejections and database
//! errors are fed back to the model so it can correct the query.
//!
//! # Quick Start
//!
//! ```bash
//! # One question, answered by a local Ollama model
//! sales-assistant ask "What was today's total revenue?"
//!
//! # Conversation with history, using OpenAI
//! export LLM_API_KEY="sk-..."
//! sales-assistant chat --provider openai
//!
//! # Check a statement against the guard without running it
//! sales-assistant check "DELETE FROM orders" -f json
//!
//! # Tables the assistant may read
//! sales-assistant tables --database-url sqlite://nexora_sales.db
//! ```
//!
//! # Exit Codes
//!
//! - `0` - Success; for `check`, the statement was accepted
//! - `1` - Failure; for `check`, the statement was rejected
//!
//! # Logging
//!
//! Logs go to stderr through `tracing`. `RUST_LOG` sets the filter
//! (default `warn`); `--verbose` raises it to `debug` and prints the tool
//! calls behind each answer.

use std::process;

use clap::Parser;
use sales_assistant::{app::run, cli::Cli};
use tokio::main;
use tracing_subscriber::EnvFilter;

#[main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
