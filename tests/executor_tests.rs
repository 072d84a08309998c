// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

mod common;

use std::{str::FromStr, time::Duration};

use sales_assistant::{
    config::DatabaseConfig,
    executor::{ExecutionError, QueryExecutor, RowSet, Value, connect},
    guard::{GuardRejection, SafetyGuard}
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tempfile::TempDir;

#[tokio::test]
async fn test_select_returns_rows() {
    let executor = common::executor().await;
    let rows = executor
        .execute("SELECT full_name, city FROM customers ORDER BY customer_id")
        .await
        .unwrap();
    assert_eq!(rows.columns, vec!["full_name", "city"]);
    assert_eq!(rows.len(), 3);
    assert!(!rows.truncated);
    assert_eq!(rows.get(0, "full_name"), Some(&Value::Text("Asha Rao".into())));
    assert_eq!(rows.get(2, "CITY"), Some(&Value::Text("Chennai".into())));
}

#[tokio::test]
async fn test_values_keep_their_types() {
    let executor = common::executor().await;
    let rows = executor
        .execute(
            "SELECT order_id, quantity, total_amount FROM orders WHERE order_id IN (2, 4) ORDER \
             BY order_id"
        )
        .await
        .unwrap();
    assert_eq!(rows.get(0, "order_id"), Some(&Value::Integer(2)));
    assert_eq!(rows.get(0, "total_amount"), Some(&Value::Real(2500.5)));
    assert_eq!(rows.get(1, "total_amount"), Some(&Value::Null));
}

#[tokio::test]
async fn test_aggregate_revenue() {
    let executor = common::executor().await;
    let rows = executor
        .execute(
            "SELECT COALESCE(SUM(total_amount), 0) AS revenue FROM orders WHERE order_date = \
             '2026-10-18'"
        )
        .await
        .unwrap();
    assert_eq!(rows.get(0, "revenue"), Some(&Value::Real(15000.5)));
    assert_eq!(rows.render(), "revenue\n15000.5\n(1 row)");
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let executor = common::executor().await;
    let rows = executor
        .execute("SELECT order_id, order_status FROM orders WHERE order_id > 100")
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(rows.columns, vec!["order_id", "order_status"]);
    assert_eq!(
        rows.render(),
        "Query returned no rows (columns: order_id, order_status)."
    );
}

#[tokio::test]
async fn test_rows_truncated_at_limit() {
    let executor = common::executor_with_limit(2).await;
    let rows = executor
        .execute("SELECT order_id FROM orders ORDER BY order_id")
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.truncated);
    assert!(rows.render().contains("more rows were omitted"));
}

#[tokio::test]
async fn test_execute_rejects_mutation() {
    let executor = common::executor().await;
    let err = executor.execute("DELETE FROM orders").await.unwrap_err();
    assert_eq!(err, ExecutionError::Rejected(GuardRejection::NotReadOnly));

    let count = executor.execute("SELECT COUNT(*) AS n FROM orders").await.unwrap();
    assert_eq!(count.get(0, "n"), Some(&Value::Integer(5)));
}

#[tokio::test]
async fn test_table_outside_allow_list() {
    let executor = common::executor().await;
    let err = executor.execute("SELECT * FROM users").await.unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::TableNotAllowed { ref table, .. } if table == "users"
    ));
    assert!(err.to_string().contains("allowed tables: customers, orders, products"));
}

#[tokio::test]
async fn test_catalog_tables_not_allowed() {
    let executor = common::executor().await;
    let err = executor
        .execute("SELECT name FROM sqlite_master")
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::TableNotAllowed { .. }));
}

#[tokio::test]
async fn test_hidden_table_in_subquery_not_allowed() {
    let executor = common::executor().await;
    let err = executor
        .execute("SELECT full_name FROM customers WHERE customer_id IN (SELECT id FROM users)")
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::TableNotAllowed { .. }));
}

#[tokio::test]
async fn test_schema_qualifier() {
    let executor = common::executor().await;
    assert!(executor.execute("SELECT COUNT(*) FROM main.orders").await.is_ok());

    let err = executor
        .execute("SELECT COUNT(*) FROM temp.orders")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::TableNotAllowed { ref table, .. } if table == "temp.orders"
    ));
}

#[tokio::test]
async fn test_cte_names_allowed() {
    let executor = common::executor().await;
    let rows = executor
        .execute(
            "WITH daily AS (SELECT order_date, SUM(total_amount) AS revenue FROM orders GROUP BY \
             order_date) SELECT order_date, revenue FROM daily ORDER BY order_date DESC LIMIT 1"
        )
        .await
        .unwrap();
    assert_eq!(rows.get(0, "order_date"), Some(&Value::Text("2026-10-18".into())));
}

#[tokio::test]
async fn test_cte_in_subquery_does_not_hide_outer_table() {
    let executor = common::executor().await;
    let err = executor
        .execute(
            "SELECT password_hash FROM users WHERE 1 IN (WITH users AS (SELECT 1 AS x) SELECT x \
             FROM users)"
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::TableNotAllowed { ref table, .. } if table == "users"
    ));
}

#[tokio::test]
async fn test_cte_in_sibling_subquery_does_not_hide_table() {
    let executor = common::executor().await;
    let err = executor
        .execute(
            "SELECT (SELECT password_hash FROM users) AS leaked, (WITH users AS (SELECT 1) \
             SELECT 1) AS y"
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::TableNotAllowed { .. }));
}

#[tokio::test]
async fn test_cte_body_cannot_name_itself() {
    let executor = common::executor().await;
    let err = executor
        .execute("WITH users AS (SELECT password_hash FROM users) SELECT * FROM users")
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::TableNotAllowed { .. }));
}

#[tokio::test]
async fn test_outer_cte_visible_in_subquery() {
    let executor = common::executor().await;
    let rows = executor
        .execute(
            "WITH paid AS (SELECT customer_id FROM orders WHERE order_status = 'Delivered') \
             SELECT COUNT(*) AS n FROM customers WHERE customer_id IN (SELECT customer_id FROM \
             paid)"
        )
        .await
        .unwrap();
    assert_eq!(rows.get(0, "n"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn test_recursive_cte_allowed() {
    let executor = common::executor().await;
    let rows = executor
        .execute(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 3) SELECT \
             x FROM c"
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_unbounded_result_stops_at_limit() {
    let executor = common::executor_with_limit(5).await;
    let rows = executor
        .execute("WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c")
        .await
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.truncated);
    assert_eq!(rows.get(4, "x"), Some(&Value::Integer(5)));
}

#[tokio::test]
async fn test_exhausted_pool_reported() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_millis(200))
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let executor = QueryExecutor::new(pool.clone(), SafetyGuard::default(), common::settings(10));
    let held = pool.acquire().await.unwrap();

    let err = executor.execute("SELECT 1 AS n").await.unwrap_err();
    assert_eq!(err, ExecutionError::PoolExhausted);

    drop(held);
    let rows = executor.execute("SELECT 1 AS n").await.unwrap();
    assert_eq!(rows.get(0, "n"), Some(&Value::Integer(1)));
}

#[tokio::test]
async fn test_quoted_and_mixed_case_tables() {
    let executor = common::executor().await;
    assert!(executor.execute("SELECT * FROM \"Orders\"").await.is_ok());
    assert!(executor.execute("SELECT * FROM PRODUCTS").await.is_ok());
}

#[tokio::test]
async fn test_unknown_column_is_database_error() {
    let executor = common::executor().await;
    let err = executor
        .execute("SELECT revenue FROM orders")
        .await
        .unwrap_err();
    match err {
        ExecutionError::Database(message) => assert!(message.contains("no such column")),
        other => panic!("unexpected error: {:?}", other)
    }
}

#[tokio::test]
async fn test_run_uses_approved_statement() {
    let executor = common::executor().await;
    let approved = executor.guard().approve("SELECT product_name FROM products;").unwrap();
    let rows = executor.run(&approved).await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_list_tables_filters_allow_list() {
    let executor = common::executor().await;
    let tables = executor.list_tables().await.unwrap();
    assert_eq!(tables, vec!["customers", "orders", "products"]);
}

#[tokio::test]
async fn test_describe_table() {
    let executor = common::executor().await;
    let description = executor.describe_table("Orders").await.unwrap();
    assert_eq!(description.table, "orders");
    assert_eq!(description.columns.len(), 8);

    let id = &description.columns[0];
    assert_eq!(id.name, "order_id");
    assert!(id.primary_key);

    let amount = description
        .columns
        .iter()
        .find(|c| c.name == "total_amount")
        .unwrap();
    assert!(amount.nullable);
    assert_eq!(amount.data_type, "REAL");

    let rendered = description.render();
    assert!(rendered.starts_with("CREATE TABLE orders ("));
    assert!(rendered.contains("\torder_date TEXT NOT NULL"));
}

#[tokio::test]
async fn test_describe_table_outside_allow_list() {
    let executor = common::executor().await;
    let err = executor.describe_table("users").await.unwrap_err();
    assert!(matches!(err, ExecutionError::TableNotAllowed { .. }));
}

#[tokio::test]
async fn test_describe_missing_allowed_table() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let executor = QueryExecutor::new(pool, SafetyGuard::default(), common::settings(10));
    let err = executor.describe_table("orders").await.unwrap_err();
    assert_eq!(err, ExecutionError::Database("no such table: orders".to_string()));
}

#[tokio::test]
async fn test_sample_rows_clamped() {
    let executor = common::executor().await;
    let rows = executor.sample_rows("orders", 2).await.unwrap();
    assert_eq!(rows.len(), 2);

    let rows = executor.sample_rows("orders", 0).await.unwrap();
    assert_eq!(rows.len(), 1);

    let rows = executor.sample_rows("orders", 500).await.unwrap();
    assert_eq!(rows.len(), 5);
}

#[test]
fn test_value_display() {
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::Integer(42).to_string(), "42");
    assert_eq!(Value::Real(12500.0).to_string(), "12500.0");
    assert_eq!(Value::Real(0.1).to_string(), "0.1");
    assert_eq!(Value::Blob(vec![1, 2, 3]).to_string(), "<blob 3 bytes>");
}

#[test]
fn test_row_set_render() {
    let rows = RowSet {
        columns:   vec!["product_name".into(), "price".into()],
        rows:      vec![
            vec![Value::Text("Laptop".into()), Value::Real(12500.0)],
            vec![Value::Text("Pen".into()), Value::Null],
        ],
        truncated: false
    };
    assert_eq!(
        rows.render(),
        "product_name | price\nLaptop | 12500.0\nPen | NULL\n(2 rows)"
    );
}

#[tokio::test]
async fn test_connect_opens_read_only_pool() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.db");
    let url = format!("sqlite://{}", path.display());

    let writer = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::from_str(&url)
                .unwrap()
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Delete)
        )
        .await
        .unwrap();
    sqlx::raw_sql(common::SEED).execute(&writer).await.unwrap();
    writer.close().await;

    let config = DatabaseConfig {
        url,
        ..Default::default()
    };
    let pool = connect(&config).await.unwrap();
    let write = sqlx::query("DELETE FROM orders").execute(&pool).await;
    assert!(write.is_err());

    let executor = QueryExecutor::new(pool, SafetyGuard::default(), common::settings(10));
    let rows = executor.execute("SELECT COUNT(*) AS n FROM orders").await.unwrap();
    assert_eq!(rows.get(0, "n"), Some(&Value::Integer(5)));
}

#[tokio::test]
async fn test_connect_reports_missing_database() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("missing.db").display()),
        acquire_timeout_secs: 1,
        ..Default::default()
    };
    let err = connect(&config).await.unwrap_err();
    assert!(err.to_string().contains("Database unavailable"));
}
