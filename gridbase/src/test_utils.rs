//! Shared constructors for tests.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::handlers::MemStore;
use crate::types::UserId;
use crate::{build_router, AppState, Config};

/// The configured administrator in test configs.
pub fn admin_user_id() -> UserId {
    "00000000-0000-0000-0000-00000000000a".parse().expect("valid uuid")
}

pub fn test_user_id() -> UserId {
    Uuid::new_v4()
}

pub fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig::Memory,
        auth: crate::config::AuthConfig {
            admin_users: vec![admin_user_id()],
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn create_test_state() -> AppState {
    AppState {
        store: Arc::new(MemStore::new()),
        config: create_test_config(),
    }
}

/// A test server over the full router, backed by the in-memory store.
pub fn create_test_server() -> (axum_test::TestServer, AppState) {
    let state = create_test_state();
    let router = build_router(&state).expect("router should build");
    let server = axum_test::TestServer::new(router).expect("Failed to create test server");
    (server, state)
}
