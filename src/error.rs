pub use masterror::{AppError, AppResult};

use crate::executor::ExecutionError;

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create terminal I/O error
pub fn io_error(stream: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("I/O error on {}: {}", stream, source))
}

/// Create LLM API error
pub fn llm_api_error(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Create HTTP error
pub fn http_error(err: reqwest::Error) -> AppError {
    let msg = if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    };
    AppError::service(msg)
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create database connection error
pub fn database_error(err: sqlx::Error) -> AppError {
    AppError::service(format!("Database unavailable: {}", err))
}

/// Create error for a database request made outside the agent loop
pub fn execution_error(err: ExecutionError) -> AppError {
    AppError::service(format!("Query failed: {}", err))
}

/// Create tool registration error
pub fn tool_registration_error(message: impl Into<String>) -> AppError {
    AppError::internal(message.into())
}

/// Describe a parser failure, with position highlighting when available
pub fn parse_error_detail(message: &str) -> String {
    // sqlparser format: "... at Line: X, Column: Y"
    if let Some(pos) = extract_position(message) {
        format!("at line {}, column {}: {}", pos.line, pos.column, message)
    } else {
        message.to_string()
    }
}

struct SqlPosition {
    line:   usize,
    column: usize
}

fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let col_marker = ", Column";

    let line_start = message.find(line_marker)?;
    let line_num_start = line_start + line_marker.len();
    let col_start = message[line_num_start..].find(col_marker)?;
    let line_str = &message[line_num_start..line_num_start + col_start];

    // Both "Column 8" and "Column: 8" occur across parser versions
    let rest = message[line_num_start + col_start + col_marker.len()..]
        .trim_start_matches(|c: char| c == ':' || c == ' ');
    let col_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let col_str = &rest[..col_end];

    match (line_str.parse(), col_str.parse()) {
        (Ok(line), Ok(column)) => Some(SqlPosition {
            line,
            column
        }),
        _ => None
    }
}
