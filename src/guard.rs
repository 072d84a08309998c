//! Safety gate in front of query execution.
//!
//! The guard decides whether a model-proposed statement may run. Rules are
//! applied in order and the first failure wins:
//!
//! | Order | Check | Rejection |
//! |-------|-------|-----------|
//! | 1 | Text parses into at least one statement | `unparseable` |
//! | 2 | Exactly one statement (one trailing `;` allowed) | `multiple statements` |
//! | 3 | The statement is a read | `only read queries are permitted` |
//! | 4 | No mutating keyword appears as a whole word | `forbidden keyword: <KW>` |
//!
//! Rule 4 scans the raw text, so it also covers subqueries, CTE bodies,
//! literals and comments. Word boundaries keep identifiers such as
//! `update_time` or `created_by` from matching.
//!
//! The guard holds no mutable state and never caches verdicts: every
//! statement is re-validated each time it is about to run.
//!
//! # Example
//!
//! ```
//! use sales_assistant::{guard::SafetyGuard, statement::SqlDialect};
//!
//! let guard = SafetyGuard::new(SqlDialect::SQLite);
//! assert!(guard.validate("SELECT SUM(total_amount) FROM orders").accepted);
//!
//! let verdict = guard.validate("DROP TABLE customers");
//! assert!(!verdict.accepted);
//! assert_eq!(verdict.reason.as_deref(), Some("only read queries are permitted"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use sqlparser::ast::Statement;
use tracing::warn;

use crate::statement::{SqlDialect, StatementKind, classify_parsed};

/// Keywords that must never appear as a whole word in an executed statement
pub const FORBIDDEN_KEYWORDS: [&str; 10] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "GRANT", "REVOKE", "CREATE",
    "REPLACE"
];

static FORBIDDEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", FORBIDDEN_KEYWORDS.join("|"))).expect("valid regex")
});

/// Reason a candidate statement was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    #[error("unparseable")]
    Unparseable,
    #[error("multiple statements")]
    MultipleStatements,
    #[error("only read queries are permitted")]
    NotReadOnly,
    #[error("forbidden keyword: {0}")]
    ForbiddenKeyword(String)
}

/// Accept/reject decision for one candidate statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardVerdict {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason:   Option<String>
}

impl GuardVerdict {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason:   None
        }
    }

    fn rejected(rejection: &GuardRejection) -> Self {
        Self {
            accepted: false,
            reason:   Some(rejection.to_string())
        }
    }
}

/// A statement that passed every guard rule.
///
/// Only [`SafetyGuard::approve`] can create one, so holding an
/// `ApprovedStatement` proves the text was validated in this call chain.
#[derive(Debug, Clone)]
pub struct ApprovedStatement {
    sql:       String,
    statement: Statement
}

impl ApprovedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn statement(&self) -> &Statement {
        &self.statement
    }
}

/// Stateless read-only gate
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGuard {
    dialect: SqlDialect
}

impl SafetyGuard {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Apply every rule and hand back a token the executor will accept
    pub fn approve(&self, text: &str) -> Result<ApprovedStatement, GuardRejection> {
        let result = self.check(text);
        if let Err(rejection) = &result {
            warn!(reason = %rejection, sql = text, "statement rejected by guard");
        }
        result
    }

    /// Validate without keeping the approval token
    pub fn validate(&self, text: &str) -> GuardVerdict {
        match self.approve(text) {
            Ok(_) => GuardVerdict::accepted(),
            Err(rejection) => GuardVerdict::rejected(&rejection)
        }
    }

    fn check(&self, text: &str) -> Result<ApprovedStatement, GuardRejection> {
        let classified = classify_parsed(text, self.dialect);
        let result = &classified.result;
        if !result.parse_succeeded {
            return Err(GuardRejection::Unparseable);
        }
        if result.statement_count != 1 {
            return Err(GuardRejection::MultipleStatements);
        }
        if result.primary_kind != StatementKind::Select {
            return Err(GuardRejection::NotReadOnly);
        }
        if let Some(keyword) = find_forbidden_keyword(text) {
            return Err(GuardRejection::ForbiddenKeyword(keyword));
        }
        let statement = classified
            .statements
            .into_iter()
            .next()
            .ok_or(GuardRejection::Unparseable)?;
        Ok(ApprovedStatement {
            sql: text.trim().trim_end_matches(';').trim_end().to_string(),
            statement
        })
    }
}

/// First mutating keyword found as a whole word, upper-cased
pub fn find_forbidden_keyword(text: &str) -> Option<String> {
    FORBIDDEN_REGEX
        .find(text)
        .map(|m| m.as_str().to_ascii_uppercase())
}
