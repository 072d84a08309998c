//! Named tools the model may invoke instead of answering directly.
//!
//! The registry maps a tool name to a [`ToolSpec`] (what the model is told)
//! and a [`ToolHandler`] (what runs). It is built once at startup and then
//! shared read-only, typically behind an `Arc`, by every conversation.
//!
//! Handlers never fail across this boundary. Guard rejections, database
//! errors, bad arguments and unknown names all come back as a
//! [`ToolResult`] whose [`observation`](ToolResult::observation) text is fed
//! to the model so it can correct itself.

mod sql;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
pub use sql::{
    ListTablesTool, QueryCheckerTool, SampleRowsTool, SchemaTool, SqlQueryTool, TOOL_LIST_TABLES,
    TOOL_QUERY, TOOL_QUERY_CHECKER, TOOL_SAMPLE_ROWS, TOOL_SCHEMA, sql_toolkit
};
use tracing::debug;

use crate::error::{AppResult, tool_registration_error};

/// Declared contract of a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name:         String,
    pub description:  String,
    /// JSON Schema of the expected arguments object
    pub input_schema: Value
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value
    ) -> Self {
        Self {
            name:         name.into(),
            description:  description.into(),
            input_schema
        }
    }
}

/// What a handler produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(String),
    /// The safety guard refused the statement
    Rejected(String),
    /// The database could not run an accepted statement
    ExecutionFailed(String),
    InvalidArguments(String),
    /// Unknown tool; carries the registered names
    NotFound(String)
}

/// Outcome of one invocation, tagged with the tool name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub outcome:   ToolOutcome
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    /// Plain-text observation appended to the transcript
    pub fn observation(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success(text) => text.clone(),
            ToolOutcome::Rejected(reason) => format!(
                "Error: query rejected by the safety guard ({}). Only a single read-only SELECT \
                 statement is allowed.",
                reason
            ),
            ToolOutcome::ExecutionFailed(message) => format!("Error: {}", message),
            ToolOutcome::InvalidArguments(message) => {
                format!("Error: invalid arguments for {}: {}", self.tool_name, message)
            }
            ToolOutcome::NotFound(available) => format!(
                "Error: {} is not a valid tool, try one of [{}].",
                self.tool_name, available
            )
        }
    }
}

/// Runs one tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &Value) -> ToolOutcome;
}

struct RegisteredTool {
    spec:    ToolSpec,
    handler: Arc<dyn ToolHandler>
}

/// Name-indexed tool table, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; names must be unique
    pub fn register<H>(&mut self, spec: ToolSpec, handler: H) -> AppResult<()>
    where
        H: ToolHandler + 'static
    {
        if self.tools.contains_key(&spec.name) {
            return Err(tool_registration_error(format!(
                "tool '{}' is already registered",
                spec.name
            )));
        }
        self.tools.insert(
            spec.name.clone(),
            RegisteredTool {
                spec,
                handler: Arc::new(handler)
            }
        );
        Ok(())
    }

    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch by name; unknown names yield a not-found result
    pub async fn invoke(&self, name: &str, arguments: &Value) -> ToolResult {
        let outcome = match self.tools.get(name) {
            Some(tool) => {
                debug!(tool = name, %arguments, "invoking tool");
                tool.handler.call(arguments).await
            }
            None => {
                debug!(tool = name, "unknown tool requested");
                let available: Vec<&str> = self.tools.keys().map(String::as_str).collect();
                ToolOutcome::NotFound(available.join(", "))
            }
        };
        ToolResult {
            tool_name: name.to_string(),
            outcome
        }
    }
}
