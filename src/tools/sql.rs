use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ToolHandler, ToolOutcome, ToolRegistry, ToolSpec};
use crate::{
    agent::{Action, ConversationTurn, Transcript},
    error::AppResult,
    executor::{ExecutionError, MAX_SAMPLE_ROWS, QueryExecutor},
    guard::SafetyGuard,
    llm::LanguageModel
};

pub const TOOL_QUERY: &str = "sql_db_query";
pub const TOOL_LIST_TABLES: &str = "sql_db_list_tables";
pub const TOOL_SCHEMA: &str = "sql_db_schema";
pub const TOOL_QUERY_CHECKER: &str = "sql_db_query_checker";
pub const TOOL_SAMPLE_ROWS: &str = "sql_db_sample_rows";

const DEFAULT_SAMPLE_ROWS: usize = 3;

/// Build the registry of SQL tools over one executor.
///
/// `reviewer` is the model the query checker asks to proofread statements;
/// without one the checker only applies the safety guard.
pub fn sql_toolkit(
    executor: QueryExecutor,
    schema_sample_rows: usize,
    reviewer: Option<Arc<dyn LanguageModel>>
) -> AppResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(SqlQueryTool::spec(), SqlQueryTool::new(executor.clone()))?;
    registry.register(ListTablesTool::spec(), ListTablesTool::new(executor.clone()))?;
    registry.register(
        SchemaTool::spec(),
        SchemaTool::new(executor.clone(), schema_sample_rows)
    )?;
    registry.register(
        QueryCheckerTool::spec(),
        QueryCheckerTool::new(*executor.guard(), reviewer)
    )?;
    registry.register(SampleRowsTool::spec(), SampleRowsTool::new(executor))?;
    Ok(registry)
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TableList {
    One(String),
    Many(Vec<String>)
}

impl TableList {
    fn names(self) -> Vec<String> {
        let raw = match self {
            Self::One(list) => list.split(',').map(str::to_string).collect(),
            Self::Many(list) => list
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SchemaArgs {
    #[serde(alias = "table_names")]
    tables: TableList
}

#[derive(Debug, Deserialize)]
struct SampleRowsArgs {
    table: String,
    limit: Option<usize>
}

fn query_argument(arguments: &Value) -> Result<String, ToolOutcome> {
    match arguments {
        Value::String(text) => Ok(text.clone()),
        other => parse_args::<QueryArgs>(other).map(|args| args.query)
    }
}

fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolOutcome> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| ToolOutcome::InvalidArguments(e.to_string()))
}

fn failure(err: ExecutionError) -> ToolOutcome {
    match err {
        ExecutionError::Rejected(rejection) => ToolOutcome::Rejected(rejection.to_string()),
        other => ToolOutcome::ExecutionFailed(other.to_string())
    }
}

/// Guarded query tool: Safety Guard wrapped around the executor
pub struct SqlQueryTool {
    executor: QueryExecutor
}

impl SqlQueryTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self {
            executor
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            TOOL_QUERY,
            "Execute a single read-only SQL SELECT statement against the sales database and \
             return the result rows. If the query is rejected or fails, an error message is \
             returned; rewrite the query and try again. Use sql_db_schema first if you are \
             unsure about column names.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "A detailed and correct SQL SELECT statement"
                    }
                },
                "required": ["query"]
            })
        )
    }
}

#[async_trait]
impl ToolHandler for SqlQueryTool {
    async fn call(&self, arguments: &Value) -> ToolOutcome {
        let query = match query_argument(arguments) {
            Ok(query) => query,
            Err(outcome) => return outcome
        };
        let approved = match self.executor.guard().approve(&query) {
            Ok(approved) => approved,
            Err(rejection) => return ToolOutcome::Rejected(rejection.to_string())
        };
        match self.executor.run(&approved).await {
            Ok(rows) => ToolOutcome::Success(rows.render()),
            Err(err) => failure(err)
        }
    }
}

/// Lists the tables the assistant may read
pub struct ListTablesTool {
    executor: QueryExecutor
}

impl ListTablesTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self {
            executor
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            TOOL_LIST_TABLES,
            "List the tables available in the sales database, as a comma-separated list.",
            json!({ "type": "object", "properties": {} })
        )
    }
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    async fn call(&self, _arguments: &Value) -> ToolOutcome {
        match self.executor.list_tables().await {
            Ok(tables) => ToolOutcome::Success(tables.join(", ")),
            Err(err) => failure(err)
        }
    }
}

/// Describes tables with a few sample rows each
pub struct SchemaTool {
    executor:    QueryExecutor,
    sample_rows: usize
}

impl SchemaTool {
    pub fn new(executor: QueryExecutor, sample_rows: usize) -> Self {
        Self {
            executor,
            sample_rows
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            TOOL_SCHEMA,
            "Return the columns and a few sample rows for the given tables. Input is a \
             comma-separated list of table names, for example: customers, orders.",
            json!({
                "type": "object",
                "properties": {
                    "tables": {
                        "type": "string",
                        "description": "Comma-separated list of table names"
                    }
                },
                "required": ["tables"]
            })
        )
    }

    async fn describe(&self, table: &str) -> Result<String, ExecutionError> {
        let description = self.executor.describe_table(table).await?;
        let mut block = description.render();
        if self.sample_rows > 0 {
            let sample = self
                .executor
                .sample_rows(&description.table, self.sample_rows)
                .await?;
            block.push_str(&format!(
                "\n\n/*\n{} rows from {} table:\n{}\n*/",
                sample.len(),
                description.table,
                sample.render()
            ));
        }
        Ok(block)
    }
}

#[async_trait]
impl ToolHandler for SchemaTool {
    async fn call(&self, arguments: &Value) -> ToolOutcome {
        let tables = match parse_args::<SchemaArgs>(arguments) {
            Ok(args) => args.tables.names(),
            Err(outcome) => return outcome
        };
        if tables.is_empty() {
            return ToolOutcome::InvalidArguments(String::from("no table names given"));
        }
        let mut blocks = Vec::with_capacity(tables.len());
        for table in &tables {
            match self.describe(table).await {
                Ok(block) => blocks.push(block),
                Err(err) => return failure(err)
            }
        }
        ToolOutcome::Success(blocks.join("\n\n"))
    }
}

/// Proofreads a statement before it is run.
///
/// The guard verdict comes first: a rejected statement returns the reason.
/// An accepted one is handed to the reviewer model, whose rewrite must pass
/// the guard too; otherwise the original statement is returned unchanged.
pub struct QueryCheckerTool {
    guard:    SafetyGuard,
    reviewer: Option<Arc<dyn LanguageModel>>
}

impl QueryCheckerTool {
    pub fn new(guard: SafetyGuard, reviewer: Option<Arc<dyn LanguageModel>>) -> Self {
        Self {
            guard,
            reviewer
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            TOOL_QUERY_CHECKER,
            "Double check that a SQL SELECT statement is correct and allowed before running it \
             with sql_db_query. Returns the statement to run, possibly corrected, or the reason \
             it would be rejected.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The SQL SELECT statement to check"
                    }
                },
                "required": ["query"]
            })
        )
    }

    fn review_transcript(&self, query: &str) -> Transcript {
        let dialect = self.guard.dialect().engine_name();
        Transcript {
            system: format!(
                "You review {dialect} queries before they run. Look for these mistakes:\n\
                 - NOT IN over a column that may contain NULL\n\
                 - UNION where UNION ALL was meant\n\
                 - BETWEEN used for an exclusive range\n\
                 - data type mismatches in predicates\n\
                 - unquoted identifiers that need quoting\n\
                 - wrong number of arguments to a function\n\
                 - casts to the wrong data type\n\
                 - joins on the wrong columns\n\
                 Rewrite the query if you find any of them, otherwise repeat it unchanged. \
                 The query must stay a single read-only SELECT. Reply with the SQL only."
            ),
            turns:  vec![ConversationTurn::user(query)]
        }
    }
}

#[async_trait]
impl ToolHandler for QueryCheckerTool {
    async fn call(&self, arguments: &Value) -> ToolOutcome {
        let query = match query_argument(arguments) {
            Ok(query) => query,
            Err(outcome) => return outcome
        };
        let approved = match self.guard.approve(&query) {
            Ok(approved) => approved,
            Err(rejection) => return ToolOutcome::Rejected(rejection.to_string())
        };
        let Some(reviewer) = &self.reviewer else {
            return ToolOutcome::Success(approved.sql().to_string());
        };
        let reply = match reviewer.generate(&self.review_transcript(approved.sql()), &[]).await {
            Ok(Action::FinalAnswer {
                text
            }) => text,
            Ok(Action::ToolCall(call)) => {
                warn!(tool = %call.name, "query reviewer asked for a tool");
                return ToolOutcome::Success(approved.sql().to_string());
            }
            Err(err) => {
                warn!(error = %err, "query review failed");
                return ToolOutcome::Success(approved.sql().to_string());
            }
        };
        let revised = strip_code_fence(&reply);
        if revised.is_empty() {
            return ToolOutcome::Success(approved.sql().to_string());
        }
        match self.guard.approve(revised) {
            Ok(checked) => {
                debug!(changed = checked.sql() != approved.sql(), "query reviewed");
                ToolOutcome::Success(checked.sql().to_string())
            }
            Err(rejection) => {
                warn!(reason = %rejection, "reviewed query rejected, keeping the original");
                ToolOutcome::Success(approved.sql().to_string())
            }
        }
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let text = reply.trim();
    let text = text
        .strip_prefix("```sql")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Returns the first rows of one table
pub struct SampleRowsTool {
    executor: QueryExecutor
}

impl SampleRowsTool {
    pub fn new(executor: QueryExecutor) -> Self {
        Self {
            executor
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            TOOL_SAMPLE_ROWS,
            format!(
                "Return a small sample of rows from one table (at most {} rows).",
                MAX_SAMPLE_ROWS
            ),
            json!({
                "type": "object",
                "properties": {
                    "table": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_SAMPLE_ROWS }
                },
                "required": ["table"]
            })
        )
    }
}

#[async_trait]
impl ToolHandler for SampleRowsTool {
    async fn call(&self, arguments: &Value) -> ToolOutcome {
        let args = match parse_args::<SampleRowsArgs>(arguments) {
            Ok(args) => args,
            Err(outcome) => return outcome
        };
        let limit = args.limit.unwrap_or(DEFAULT_SAMPLE_ROWS);
        match self.executor.sample_rows(&args.table, limit).await {
            Ok(rows) => ToolOutcome::Success(rows.render()),
            Err(err) => failure(err)
        }
    }
}
