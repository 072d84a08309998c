//! Read-only statement execution against the sales database.
//!
//! The executor owns its connection pool; nothing here is process-global.
//! Two entry points exist:
//!
//! - [`QueryExecutor::run`] takes an [`ApprovedStatement`], which only the
//!   guard can mint. This is the tool-dispatch path.
//! - [`QueryExecutor::execute`] takes raw text and re-runs the guard first,
//!   so direct callers cannot bypass it.
//!
//! Both apply the table allow-list to the parsed statement before touching
//! the database, and stop reading one row past `row_limit`. The pool itself is opened read-only with
//! `PRAGMA query_only = ON` on every connection.

mod relations;
mod types;

use std::{str::FromStr, time::Duration};

use compact_str::CompactString;
use futures_util::TryStreamExt;
use sqlx::{
    Column, Executor, Row, TypeInfo, ValueRef,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow}
};
use tokio::time::timeout;
use tracing::{debug, warn};
pub use types::{ColumnInfo, ExecutionError, RowSet, TableDescription, Value};

use self::relations::{collect_relations, normalize_identifier};
use crate::{
    config::DatabaseConfig,
    error::{AppResult, database_error},
    guard::{ApprovedStatement, SafetyGuard}
};

/// Upper bound for rows returned by the sample-rows helper
pub const MAX_SAMPLE_ROWS: usize = 10;

/// Scope and limits applied to every statement
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Schema name accepted as a table qualifier
    pub schema:            String,
    /// Tables (or views) statements may read
    pub tables:            Vec<String>,
    /// Rows kept per result; extra rows are dropped and flagged
    pub row_limit:         usize,
    pub statement_timeout: Duration
}

impl ExecutorSettings {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            schema:            config.schema.clone(),
            tables:            config.tables.clone(),
            row_limit:         config.row_limit.max(1),
            statement_timeout: Duration::from_secs(config.statement_timeout_secs.max(1))
        }
    }
}

/// Open a read-only pool for the configured database
pub async fn connect(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(database_error)?
        .read_only(true);
    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA query_only = ON")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await
        .map_err(database_error)
}

/// Guarded executor over a pooled connection set
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool:     SqlitePool,
    guard:    SafetyGuard,
    settings: ExecutorSettings
}

impl QueryExecutor {
    pub fn new(pool: SqlitePool, guard: SafetyGuard, settings: ExecutorSettings) -> Self {
        Self {
            pool,
            guard,
            settings
        }
    }

    pub fn guard(&self) -> &SafetyGuard {
        &self.guard
    }

    /// Validate and run raw text
    pub async fn execute(&self, text: &str) -> Result<RowSet, ExecutionError> {
        let approved = self.guard.approve(text)?;
        self.run(&approved).await
    }

    /// Run a statement the guard already approved
    pub async fn run(&self, approved: &ApprovedStatement) -> Result<RowSet, ExecutionError> {
        self.check_relations(approved)?;
        let sql = approved.sql();
        debug!(sql, "executing statement");
        let limit = self.settings.statement_timeout;
        let rows = match timeout(limit, self.fetch_capped(sql)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(err)) => {
                let err = ExecutionError::from(err);
                warn!(error = %err, sql, "statement failed");
                return Err(err);
            }
            Err(_) => {
                warn!(sql, "statement timed out");
                return Err(ExecutionError::Timeout(limit.as_secs()));
            }
        };
        let columns: Vec<CompactString> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().into()).collect(),
            None => self.describe_columns(sql).await
        };
        let truncated = rows.len() > self.settings.row_limit;
        let decoded = rows
            .iter()
            .take(self.settings.row_limit)
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rows = decoded.len(), truncated, "statement finished");
        Ok(RowSet {
            columns,
            rows: decoded,
            truncated
        })
    }

    /// Allowed tables that exist in the database
    pub async fn list_tables(&self) -> Result<Vec<String>, ExecutionError> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name"
        )
        .fetch_all(&self.pool)
        .await?;
        let mut present = Vec::new();
        for row in &rows {
            let name: String = row.try_get(0)?;
            if let Some(allowed) = self.allowed_table(&name) {
                present.push(allowed.to_string());
            }
        }
        Ok(present)
    }

    /// Column layout of one allowed table
    pub async fn describe_table(&self, table: &str) -> Result<TableDescription, ExecutionError> {
        let table = self.resolve_table(table)?.to_string();
        let rows = sqlx::query(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid"
        )
        .bind(&table)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Err(ExecutionError::Database(format!("no such table: {}", table)));
        }
        let columns = rows
            .iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name:        row.try_get(0)?,
                    data_type:   row.try_get(1)?,
                    nullable:    row.try_get::<i64, _>(2)? == 0,
                    primary_key: row.try_get::<i64, _>(3)? > 0
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(TableDescription {
            table,
            columns
        })
    }

    /// First rows of one allowed table, through the guarded path
    pub async fn sample_rows(&self, table: &str, limit: usize) -> Result<RowSet, ExecutionError> {
        let table = self.resolve_table(table)?;
        let limit = limit.clamp(1, MAX_SAMPLE_ROWS);
        let sql = format!("SELECT * FROM \"{}\" LIMIT {}", table, limit);
        self.execute(&sql).await
    }

    fn check_relations(&self, approved: &ApprovedStatement) -> Result<(), ExecutionError> {
        let relations = collect_relations(approved.statement());
        for parts in &relations.names {
            let allowed = match parts.as_slice() {
                [name] => self.allowed_table(name).is_some(),
                [schema, name] => {
                    schema.eq_ignore_ascii_case(&self.settings.schema)
                        && self.allowed_table(name).is_some()
                }
                _ => false
            };
            if !allowed {
                let table = parts.join(".");
                warn!(table = %table, "statement references a table outside the allow-list");
                return Err(self.not_allowed(table));
            }
        }
        Ok(())
    }

    fn resolve_table(&self, raw: &str) -> Result<&str, ExecutionError> {
        let parts: Vec<String> = raw.split('.').map(normalize_identifier).collect();
        let name = match parts.as_slice() {
            [name] => Some(name.as_str()),
            [schema, name] if schema.eq_ignore_ascii_case(&self.settings.schema) => {
                Some(name.as_str())
            }
            _ => None
        };
        name.and_then(|n| self.allowed_table(n))
            .ok_or_else(|| self.not_allowed(raw.trim().to_string()))
    }

    fn allowed_table(&self, name: &str) -> Option<&str> {
        self.settings
            .tables
            .iter()
            .find(|t| t.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    fn not_allowed(&self, table: String) -> ExecutionError {
        ExecutionError::TableNotAllowed {
            table,
            allowed: self.settings.tables.join(", ")
        }
    }

    /// Stream rows and stop one past the cap, so the extra row only flags
    /// truncation
    async fn fetch_capped(&self, sql: &str) -> Result<Vec<SqliteRow>, sqlx::Error> {
        let mut stream = sqlx::query(sql).fetch(&self.pool);
        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await? {
            rows.push(row);
            if rows.len() > self.settings.row_limit {
                break;
            }
        }
        Ok(rows)
    }

    async fn describe_columns(&self, sql: &str) -> Vec<CompactString> {
        match (&self.pool).describe(sql).await {
            Ok(described) => described.columns().iter().map(|c| c.name().into()).collect(),
            Err(err) => {
                warn!(error = %err, sql, "could not describe result columns");
                Vec::new()
            }
        }
    }
}

fn decode_row(row: &SqliteRow) -> Result<Vec<Value>, sqlx::Error> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    // SQLite reports the storage class of the value, not the declared type
    let storage = raw.type_info().name().to_ascii_uppercase();
    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get_unchecked(index)?),
        "REAL" | "NUMERIC" => Value::Real(row.try_get_unchecked(index)?),
        "BLOB" => Value::Blob(row.try_get_unchecked(index)?),
        _ => Value::Text(row.try_get_unchecked(index)?)
    };
    Ok(value)
}
