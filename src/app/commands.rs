//! Command execution: guard checks, table listing and agent conversations.

use std::{
    io::{self, Write},
    sync::Arc,
    time::Duration
};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tracing::info;

use super::{
    convert::parse_dialect,
    helpers::{build_llm_provider, check_exit_code, create_output_options, read_sql_input},
    types::{CommandOutput, GlobalOptions}
};
use crate::{
    agent::{Agent, AgentSettings, ConversationTurn},
    cli::Format,
    config::Config,
    error::{AppResult, execution_error, io_error},
    executor::{ExecutorSettings, QueryExecutor, connect},
    guard::SafetyGuard,
    llm::{LanguageModel, LlmClient},
    output::{format_answer, format_check_result, format_tables},
    prompt::PromptPolicy,
    statement::classify,
    tools::sql_toolkit
};

/// Run the guard over one statement without touching the database
pub fn run_check(
    sql_arg: &str,
    format: Format,
    config: &Config,
    options: &GlobalOptions
) -> AppResult<CommandOutput> {
    let sql = read_sql_input(sql_arg)?;
    let dialect = parse_dialect(&config.database.dialect)?;
    let guard = SafetyGuard::new(dialect);
    let verdict = guard.validate(&sql);
    let classification = classify(&sql, dialect);
    let opts = create_output_options(format, options.no_color, options.verbose);
    Ok(CommandOutput {
        exit_code: check_exit_code(&verdict),
        output:    format_check_result(sql.trim(), &verdict, &classification, &opts)
    })
}

/// Open the sales database and wrap it in a guarded executor
pub async fn build_executor(config: &Config) -> AppResult<QueryExecutor> {
    let dialect = parse_dialect(&config.database.dialect)?;
    let pool = connect(&config.database).await?;
    Ok(QueryExecutor::new(
        pool,
        SafetyGuard::new(dialect),
        ExecutorSettings::from_config(&config.database)
    ))
}

/// Assemble the agent: database tools, model client and policy
pub async fn build_agent(config: &Config) -> AppResult<Agent> {
    let provider = build_llm_provider(config)?;
    let executor = build_executor(config).await?;
    let client = LlmClient::new(provider, &config.llm, config.retry.clone());
    info!(provider = client.provider().name(), "model client ready");
    let model: Arc<dyn LanguageModel> = Arc::new(client);
    let registry = sql_toolkit(executor, config.database.sample_rows, Some(model.clone()))?;
    info!(tools = registry.len(), "agent ready");
    Ok(Agent::new(
        model,
        Arc::new(registry),
        PromptPolicy::from_config(config),
        AgentSettings::from_config(&config.agent)
    ))
}

/// List the allowed tables present in the database
pub async fn run_tables(
    format: Format,
    config: &Config,
    options: &GlobalOptions
) -> AppResult<CommandOutput> {
    let executor = build_executor(config).await?;
    let tables = executor.list_tables().await.map_err(execution_error)?;
    let opts = create_output_options(format, options.no_color, options.verbose);
    Ok(CommandOutput::success(format_tables(&tables, &opts)))
}

/// Answer a single question; exits non-zero when the turn failed
pub async fn run_ask(
    question: &str,
    format: Format,
    config: &Config,
    options: &GlobalOptions
) -> AppResult<CommandOutput> {
    let agent = build_agent(config).await?;
    let opts = create_output_options(format, options.no_color, options.verbose);
    let pb = spinner("Thinking...");
    let outcome = agent.run_turn_detailed(question, &[]).await;
    pb.finish_and_clear();
    Ok(CommandOutput {
        exit_code: if outcome.is_done() { 0 } else { 1 },
        output:    format_answer(question, &outcome, &opts)
    })
}

/// Interactive conversation on stdin with in-memory history
pub async fn run_chat(config: &Config, options: &GlobalOptions) -> AppResult<i32> {
    let agent = build_agent(config).await?;
    let opts = create_output_options(Format::Text, options.no_color, options.verbose);
    let mut lines = BufReader::new(stdin()).lines();
    let mut history: Vec<ConversationTurn> = Vec::new();

    println!(
        "{} is ready. Type 'exit' to leave.",
        config.agent.assistant_name
    );
    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| io_error("stdout", e))?;
        let Some(line) = lines.next_line().await.map_err(|e| io_error("stdin", e))? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message.to_ascii_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        let pb = spinner("Thinking...");
        let outcome = agent.run_turn_detailed(message, &history).await;
        pb.finish_and_clear();
        println!("{}\n", format_answer(message, &outcome, &opts));
        history.push(ConversationTurn::user(message));
        history.push(ConversationTurn::assistant(outcome.answer));
    }
    Ok(0)
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
