// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use sales_assistant::{
    app::{
        GlobalOptions, apply_overrides, build_llm_provider, convert_format, create_output_options,
        load_config, parse_dialect, parse_provider, read_sql_input, resolve_provider, run_check
    },
    cli::{Format, Provider},
    config::Config,
    llm::LlmProvider,
    output::OutputFormat,
    statement::SqlDialect
};

fn no_color() -> GlobalOptions {
    GlobalOptions {
        no_color: true,
        ..Default::default()
    }
}

#[test]
fn test_convert_format() {
    assert_eq!(convert_format(Format::Text), OutputFormat::Text);
    assert_eq!(convert_format(Format::Json), OutputFormat::Json);
    assert_eq!(convert_format(Format::Yaml), OutputFormat::Yaml);
}

#[test]
fn test_parse_provider() {
    assert_eq!(parse_provider("openai").unwrap(), Provider::OpenAI);
    assert_eq!(parse_provider("open-ai").unwrap(), Provider::OpenAI);
    assert_eq!(parse_provider(" Anthropic ").unwrap(), Provider::Anthropic);
    assert_eq!(parse_provider("OLLAMA").unwrap(), Provider::Ollama);
}

#[test]
fn test_parse_unknown_provider() {
    let err = parse_provider("gemini").unwrap_err();
    assert!(err.to_string().contains("Unknown LLM provider 'gemini'"));
}

#[test]
fn test_parse_dialect() {
    assert_eq!(parse_dialect("sqlite").unwrap(), SqlDialect::SQLite);
    assert_eq!(parse_dialect("Postgres").unwrap(), SqlDialect::PostgreSQL);
    assert!(parse_dialect("oracle").is_err());
}

#[test]
fn test_read_sql_input_literal() {
    assert_eq!(read_sql_input("SELECT 1").unwrap(), "SELECT 1");
}

#[test]
fn test_apply_overrides() {
    let mut config = Config::default();
    let options = GlobalOptions {
        database_url: Some("sqlite://other.db".to_string()),
        provider: Some(Provider::Anthropic),
        model: Some("claude-test".to_string()),
        api_key: Some("key".to_string()),
        ollama_url: Some("http://gpu:11434".to_string()),
        ..Default::default()
    };
    apply_overrides(&mut config, &options);

    assert_eq!(config.database.url, "sqlite://other.db");
    assert_eq!(config.llm.provider.as_deref(), Some("anthropic"));
    assert_eq!(config.llm.model.as_deref(), Some("claude-test"));
    assert_eq!(config.llm.api_key.as_deref(), Some("key"));
    assert_eq!(config.llm.ollama_url.as_deref(), Some("http://gpu:11434"));
}

#[test]
fn test_apply_overrides_keeps_unset_values() {
    let mut config = Config::default();
    config.llm.model = Some("configured".to_string());
    apply_overrides(&mut config, &GlobalOptions::default());
    assert_eq!(config.llm.model.as_deref(), Some("configured"));
    assert_eq!(config.database.url, "sqlite://nexora_sales.db");
}

#[test]
fn test_load_config_from_explicit_path() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "[agent]\nassistant_name = \"Ledger\"\n").unwrap();
    let options = GlobalOptions {
        config_path: Some(PathBuf::from(file.path())),
        model: Some("override".to_string()),
        ..Default::default()
    };
    let config = load_config(&options).unwrap();
    assert_eq!(config.agent.assistant_name, "Ledger");
    assert_eq!(config.llm.model.as_deref(), Some("override"));
}

#[test]
fn test_resolve_provider_defaults_to_ollama() {
    assert_eq!(resolve_provider(&Config::default()).unwrap(), Provider::Ollama);
}

#[test]
fn test_build_ollama_provider() {
    match build_llm_provider(&Config::default()).unwrap() {
        LlmProvider::Ollama {
            base_url,
            model
        } => {
            assert_eq!(base_url, "http://localhost:11434");
            assert_eq!(model, "llama3.2");
        }
        other => panic!("unexpected provider: {:?}", other.name())
    }
}

#[test]
fn test_build_openai_provider_requires_key() {
    let mut config = Config::default();
    config.llm.provider = Some("openai".to_string());
    let err = build_llm_provider(&config).unwrap_err();
    assert!(err.to_string().contains("API key required for OpenAI"));

    config.llm.api_key = Some("sk-test".to_string());
    match build_llm_provider(&config).unwrap() {
        LlmProvider::OpenAI {
            model, ..
        } => assert_eq!(model, "gpt-4o"),
        other => panic!("unexpected provider: {:?}", other.name())
    }
}

#[test]
fn test_build_anthropic_provider_uses_configured_model() {
    let mut config = Config::default();
    config.llm.provider = Some("anthropic".to_string());
    config.llm.api_key = Some("key".to_string());
    config.llm.model = Some("claude-test".to_string());
    match build_llm_provider(&config).unwrap() {
        LlmProvider::Anthropic {
            model, ..
        } => assert_eq!(model, "claude-test"),
        other => panic!("unexpected provider: {:?}", other.name())
    }
}

#[test]
fn test_create_output_options() {
    let opts = create_output_options(Format::Json, true, true);
    assert_eq!(opts.format, OutputFormat::Json);
    assert!(!opts.colored);
    assert!(opts.verbose);
}

#[test]
fn test_run_check_accepted() {
    let output = run_check("SELECT 1", Format::Text, &Config::default(), &no_color()).unwrap();
    assert_eq!(output.exit_code, 0);
    assert!(output.output.starts_with("ACCEPTED"));
}

#[test]
fn test_run_check_rejected() {
    let output = run_check(
        "SELECT REPLACE(full_name, 'a', 'b') FROM customers",
        Format::Text,
        &Config::default(),
        &no_color()
    )
    .unwrap();
    assert_eq!(output.exit_code, 1);
    assert!(output.output.contains("forbidden keyword: REPLACE"));
}

#[test]
fn test_run_check_bad_dialect() {
    let mut config = Config::default();
    config.database.dialect = "oracle".to_string();
    assert!(run_check("SELECT 1", Format::Text, &config, &no_color()).is_err());
}
