//! Grammar-aware classification of candidate SQL statements.
//!
//! Classification never executes anything. It tokenizes the text to count
//! statement fragments (so separators inside literals and comments are not
//! mistaken for terminators), then parses it with [`sqlparser`] to decide
//! whether the statement is a plain read.

mod types;

use sqlparser::{
    ast::{SetExpr, Statement},
    dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect},
    parser::Parser,
    tokenizer::{Token, Tokenizer}
};
pub use types::{ClassificationResult, StatementKind};

use crate::error::parse_error_detail;

/// SQL dialect for parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum SqlDialect {
    Generic,
    MySQL,
    PostgreSQL,
    #[default]
    SQLite
}

impl SqlDialect {
    /// Convert to sqlparser dialect for parsing
    pub fn into_parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::MySQL => Box::new(MySqlDialect {}),
            Self::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Self::SQLite => Box::new(SQLiteDialect {})
        }
    }

    /// Human-readable engine name used in prompts
    pub fn engine_name(self) -> &'static str {
        match self {
            Self::Generic => "ANSI SQL",
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite"
        }
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "ansi" => Ok(Self::Generic),
            "mysql" => Ok(Self::MySQL),
            "postgres" | "postgresql" => Ok(Self::PostgreSQL),
            "sqlite" => Ok(Self::SQLite),
            other => Err(format!("unknown SQL dialect '{}'", other))
        }
    }
}

/// Classification plus the parsed statements, for callers that go on to
/// inspect the AST.
#[derive(Debug, Clone)]
pub(crate) struct Classified {
    pub result:     ClassificationResult,
    pub statements: Vec<Statement>,
    pub error:      Option<String>
}

/// Classify a candidate statement
///
/// # Example
///
/// ```
/// use sales_assistant::statement::{SqlDialect, StatementKind, classify};
///
/// let result = classify("SELECT id FROM orders;", SqlDialect::SQLite);
/// assert!(result.parse_succeeded);
/// assert_eq!(result.statement_count, 1);
/// assert_eq!(result.primary_kind, StatementKind::Select);
/// ```
pub fn classify(text: &str, dialect: SqlDialect) -> ClassificationResult {
    classify_parsed(text, dialect).result
}

/// Parser error message for text that fails to classify, if any
pub fn parse_error(text: &str, dialect: SqlDialect) -> Option<String> {
    classify_parsed(text, dialect).error
}

pub(crate) fn classify_parsed(text: &str, dialect: SqlDialect) -> Classified {
    let parser_dialect = dialect.into_parser_dialect();
    let fragments = match count_fragments(parser_dialect.as_ref(), text) {
        Ok(count) => count,
        Err(message) => return unparseable(message)
    };
    let statements = match Parser::parse_sql(parser_dialect.as_ref(), text) {
        Ok(statements) => statements,
        Err(e) => return unparseable(parse_error_detail(&e.to_string()))
    };
    let Some(first) = statements.first() else {
        return unparseable(String::from("no statement found"));
    };
    let primary_kind = statement_kind(first);
    Classified {
        result: ClassificationResult {
            statement_count: fragments.max(statements.len()),
            primary_kind,
            parse_succeeded: true
        },
        statements,
        error: None
    }
}

fn unparseable(message: String) -> Classified {
    Classified {
        result:     ClassificationResult::unparseable(),
        statements: Vec::new(),
        error:      Some(message)
    }
}

/// Count `;`-separated fragments, ignoring one trailing fragment that holds
/// only whitespace and comments.
fn count_fragments(dialect: &dyn Dialect, text: &str) -> Result<usize, String> {
    let tokens = Tokenizer::new(dialect, text)
        .tokenize()
        .map_err(|e| parse_error_detail(&e.to_string()))?;
    let mut blank_flags = vec![true];
    for token in &tokens {
        match token {
            Token::SemiColon => blank_flags.push(true),
            Token::Whitespace(_) | Token::EOF => {}
            _ => {
                if let Some(last) = blank_flags.last_mut() {
                    *last = false;
                }
            }
        }
    }
    if blank_flags.last() == Some(&true) {
        blank_flags.pop();
    }
    Ok(blank_flags.len())
}

fn statement_kind(statement: &Statement) -> StatementKind {
    match statement {
        Statement::Query(query) if is_read_only_body(&query.body) => StatementKind::Select,
        _ => StatementKind::NonSelect
    }
}

fn is_read_only_body(body: &SetExpr) -> bool {
    match body {
        // SELECT ... INTO creates a table
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_read_only_body(&query.body),
        SetExpr::SetOperation {
            left,
            right,
            ..
        } => is_read_only_body(left) && is_read_only_body(right),
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        _ => false
    }
}
