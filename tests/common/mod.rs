// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use std::{collections::VecDeque, sync::Mutex, time::Duration};

use async_trait::async_trait;
use sales_assistant::{
    agent::{Action, Transcript},
    error::{AppResult, llm_api_error},
    executor::{ExecutorSettings, QueryExecutor},
    guard::SafetyGuard,
    llm::LanguageModel,
    tools::ToolSpec
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub const SEED: &str = r#"
CREATE TABLE customers (
    customer_id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT,
    mobile_number TEXT,
    city TEXT,
    state TEXT
);
CREATE TABLE products (
    product_id INTEGER PRIMARY KEY,
    product_name TEXT NOT NULL,
    category TEXT,
    price REAL NOT NULL,
    stock INTEGER
);
CREATE TABLE orders (
    order_id INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    product_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    total_amount REAL,
    payment_mode TEXT,
    order_status TEXT,
    order_date TEXT NOT NULL
);
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    password_hash TEXT
);
INSERT INTO customers VALUES
    (1, 'Asha Rao', 'asha@example.com', '9000000001', 'Pune', 'Maharashtra'),
    (2, 'Vikram Shah', 'vikram@example.com', '9000000002', 'Surat', 'Gujarat'),
    (3, 'Meera Iyer', NULL, '9000000003', 'Chennai', 'Tamil Nadu');
INSERT INTO products VALUES
    (1, 'Laptop', 'Electronics', 12500.0, 10),
    (2, 'Desk Chair', 'Furniture', 2500.5, 25),
    (3, 'Notebook', 'Stationery', 45.25, 500);
INSERT INTO orders VALUES
    (1, 1, 1, 1, 12500.0, 'UPI', 'Delivered', '2026-10-18'),
    (2, 2, 2, 1, 2500.5, 'Card', 'Delivered', '2026-10-18'),
    (3, 3, 3, 4, 181.0, 'Cash', 'Pending', '2026-10-17'),
    (4, 1, 3, 2, NULL, 'UPI', 'Cancelled', '2026-09-30'),
    (5, 2, 1, 1, 12500.0, 'Card', 'Delivered', '2026-09-02');
INSERT INTO users VALUES (1, 'secret');
"#;

pub const ALLOWED_TABLES: [&str; 3] = ["customers", "orders", "products"];

/// Single-connection in-memory database holding the seed data
pub async fn seeded_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::raw_sql(SEED).execute(&pool).await.unwrap();
    pool
}

pub fn settings(row_limit: usize) -> ExecutorSettings {
    ExecutorSettings {
        schema: "main".to_string(),
        tables: ALLOWED_TABLES.iter().map(|t| t.to_string()).collect(),
        row_limit,
        statement_timeout: Duration::from_secs(5)
    }
}

pub async fn executor() -> QueryExecutor {
    executor_with_limit(200).await
}

pub async fn executor_with_limit(row_limit: usize) -> QueryExecutor {
    QueryExecutor::new(seeded_pool().await, SafetyGuard::default(), settings(row_limit))
}

type Step = Box<dyn Fn(&Transcript, &[ToolSpec]) -> AppResult<Action> + Send + Sync>;

/// Language model that replays a fixed script, one step per call
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    seen:  Mutex<Vec<Transcript>>
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            seen:  Mutex::new(Vec::new())
        }
    }

    pub fn then<F>(self, step: F) -> Self
    where
        F: Fn(&Transcript, &[ToolSpec]) -> AppResult<Action> + Send + Sync + 'static
    {
        self.steps.lock().unwrap().push_back(Box::new(step));
        self
    }

    pub fn then_action(self, action: Action) -> Self {
        self.then(move |_, _| Ok(action.clone()))
    }

    pub fn then_error(self, message: &'static str) -> Self {
        self.then(move |_, _| Err(llm_api_error(message)))
    }

    /// Transcripts received so far, in call order
    pub fn transcripts(&self) -> Vec<Transcript> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, transcript: &Transcript, tools: &[ToolSpec]) -> AppResult<Action> {
        self.seen.lock().unwrap().push(transcript.clone());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(step) => step(transcript, tools),
            None => Err(llm_api_error("script exhausted"))
        }
    }
}

/// Language model that proposes the same tool call forever
pub struct RepeatingModel {
    pub action: Action,
    calls:      Mutex<usize>
}

impl RepeatingModel {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            calls: Mutex::new(0)
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LanguageModel for RepeatingModel {
    async fn generate(&self, _transcript: &Transcript, _tools: &[ToolSpec]) -> AppResult<Action> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.action.clone())
    }
}

/// Content of the most recent turn of a transcript
pub fn last_turn(transcript: &Transcript) -> &str {
    transcript
        .turns
        .last()
        .map(|t| t.content.as_str())
        .unwrap_or_default()
}
