//! # Sales Assistant Library
//!
//! Conversational sales analytics over a guarded SQL executor.
//!
//! # Modules
//!
//! - [`statement`] - grammar-aware SQL statement classification
//! - [`guard`] - accept/reject gate in front of every execution
//! - [`executor`] - read-only query execution against the sales database
//! - [`tools`] - named tools the model may invoke
//! - [`agent`] - the tool-calling loop for one conversation turn
//! - [`llm`] - LLM provider integrations (OpenAI, Anthropic, Ollama)
//! - [`prompt`] - the policy preamble sent with every turn
//! - [`config`] - configuration loading
//! - [`output`] - result formatting for text, JSON and YAML
//! - [`app`] - command logic behind the CLI
//! - [`error`] - error types and constructors

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod guard;
pub mod llm;
pub mod output;
pub mod prompt;
pub mod statement;
pub mod tools;
