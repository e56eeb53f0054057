//! Integration tests: the full router driven over HTTP against the
//! in-memory backend.


use std::time::Duration;

use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::models::query_logs::{QueryLogEntry, QueryLogFilter};
use crate::test_utils::create_test_server;
use crate::types::{DatabaseId, UserId};
use crate::AppState;

/// Header the identity proxy would inject in production.
pub const USER_HEADER: &str = "x-gridbase-user";

pub struct Tenant {
    pub user_id: UserId,
    pub database_id: DatabaseId,
    pub api_key: String,
}

/// Stand up a server with one tenant: a user owning one database (with its
/// default API key) and one `users` table.
pub async fn server_with_tenant() -> (TestServer, AppState, Tenant) {
    let (server, state) = create_test_server();
    let tenant = onboard_tenant(&server, Uuid::new_v4(), "app", "users").await;
    (server, state, tenant)
}

/// Onboard a tenant through the management API, the way the dashboard would.
pub async fn onboard_tenant(server: &TestServer, user_id: UserId, database_name: &str, table_name: &str) -> Tenant {
    let response = server
        .post("/admin/api/v1/databases")
        .add_header(USER_HEADER, user_id.to_string())
        .json(&json!({ "name": database_name }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let database: Value = response.json();
    let database_id: DatabaseId = database["id"].as_str().unwrap().parse().unwrap();

    let response = server
        .post(&format!("/admin/api/v1/databases/{database_id}/tables"))
        .add_header(USER_HEADER, user_id.to_string())
        .json(&json!({ "name": table_name }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    // The default key provisioned at database creation
    let keys: Value = server
        .get("/admin/api/v1/api-keys")
        .add_header(USER_HEADER, user_id.to_string())
        .await
        .json();
    let api_key = keys[0]["key_value"].as_str().unwrap().to_string();

    Tenant {
        user_id,
        database_id,
        api_key,
    }
}

/// Audit writes are fire-and-forget; poll until the expected number of
/// entries lands (or fail after a second).
pub async fn wait_for_log_count(state: &AppState, expected: usize) -> Vec<QueryLogEntry> {
    let filter = QueryLogFilter {
        limit: 1000,
        ..Default::default()
    };
    for _ in 0..100 {
        let logs = state.store.list_query_logs(&filter).await.expect("log listing should work");
        if logs.len() >= expected {
            return logs;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected at least {expected} query log entries");
}
