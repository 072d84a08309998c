// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use sales_assistant::{
    error::{
        config_error, database_error, execution_error, file_read_error, io_error, llm_api_error,
        parse_error_detail, tool_registration_error
    },
    executor::ExecutionError
};

#[test]
fn test_file_read_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error = file_read_error("/path/to/config.toml", io_error);
    assert!(error.to_string().contains("/path/to/config.toml"));
}

#[test]
fn test_io_error() {
    let source = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let error = io_error("stdout", source);
    assert!(error.to_string().contains("stdout"));
}

#[test]
fn test_config_error() {
    let error = config_error("Missing API key");
    assert!(error.to_string().contains("Missing API key"));
}

#[test]
fn test_llm_api_error() {
    let error = llm_api_error("OpenAI API error 429: rate limited");
    assert!(error.to_string().contains("429"));
}

#[test]
fn test_database_error() {
    let error = database_error(sqlx::Error::PoolTimedOut);
    assert!(error.to_string().contains("Database unavailable"));
}

#[test]
fn test_execution_error() {
    let error = execution_error(ExecutionError::Timeout(15));
    assert!(error.to_string().contains("15s"));
}

#[test]
fn test_tool_registration_error() {
    let error = tool_registration_error("tool 'x' is already registered");
    assert!(error.to_string().contains("already registered"));
}

#[test]
fn test_parse_error_detail_with_position() {
    let detail = parse_error_detail("Expected: end of statement, found: FOO at Line: 1, Column: 8");
    assert!(detail.starts_with("at line 1, column 8: "));
}

#[test]
fn test_parse_error_detail_legacy_position() {
    let detail = parse_error_detail("Unexpected token at Line: 3, Column 12");
    assert!(detail.starts_with("at line 3, column 12: "));
}

#[test]
fn test_parse_error_detail_without_position() {
    assert_eq!(parse_error_detail("Unexpected EOF"), "Unexpected EOF");
}

#[test]
fn test_execution_error_from_sqlx() {
    assert_eq!(
        ExecutionError::from(sqlx::Error::PoolTimedOut),
        ExecutionError::PoolExhausted
    );
    assert!(matches!(
        ExecutionError::from(sqlx::Error::PoolClosed),
        ExecutionError::ConnectionLost(_)
    ));
}
