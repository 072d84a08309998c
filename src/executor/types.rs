use compact_str::CompactString;
use serde::Serialize;

use crate::guard::GuardRejection;

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>)
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(v) => write!(f, "{}", v),
            // Debug keeps the shortest round-trip form and the decimal point
            Self::Real(v) => write!(f, "{:?}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Blob(v) => write!(f, "<blob {} bytes>", v.len())
        }
    }
}

/// Tabular result of one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    pub columns:   Vec<CompactString>,
    pub rows:      Vec<Vec<Value>>,
    pub truncated: bool
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at `row` for the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(index)
    }

    /// Render as a plain-text table the model can read
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return format!(
                "Query returned no rows (columns: {}).",
                self.columns.join(", ")
            );
        }
        let mut out = self.columns.join(" | ");
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        let noun = if self.rows.len() == 1 { "row" } else { "rows" };
        if self.truncated {
            out.push_str(&format!(
                "({} {}, more rows were omitted; refine the query)",
                self.rows.len(),
                noun
            ));
        } else {
            out.push_str(&format!("({} {})", self.rows.len(), noun));
        }
        out
    }
}

/// Column metadata returned by table introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name:        String,
    pub data_type:   String,
    pub nullable:    bool,
    pub primary_key: bool
}

/// Columns of one allowed table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescription {
    pub table:   String,
    pub columns: Vec<ColumnInfo>
}

impl TableDescription {
    /// Render as a CREATE TABLE-like block
    pub fn render(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut line = format!("\t{} {}", c.name, c.data_type);
                if !c.nullable {
                    line.push_str(" NOT NULL");
                }
                if c.primary_key {
                    line.push_str(" PRIMARY KEY");
                }
                line
            })
            .collect();
        format!("CREATE TABLE {} (\n{}\n)", self.table, columns.join(",\n"))
    }
}

/// Database-level failure surfaced to the model as an observation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Rejected(#[from] GuardRejection),
    #[error("table '{table}' is not available; allowed tables: {allowed}")]
    TableNotAllowed { table: String, allowed: String },
    #[error("database error: {0}")]
    Database(String),
    #[error("query exceeded the {0}s time limit")]
    Timeout(u64),
    #[error("no database connection available, try again shortly")]
    PoolExhausted,
    #[error("database connection lost: {0}")]
    ConnectionLost(String)
}

impl From<sqlx::Error> for ExecutionError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => Self::Database(db.message().to_string()),
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            sqlx::Error::PoolClosed => Self::ConnectionLost(String::from("pool closed")),
            sqlx::Error::Io(io) => Self::ConnectionLost(io.kind().to_string()),
            other => Self::Database(other.to_string())
        }
    }
}
