//! Request/response data structures for the management API.

pub mod api_keys;
pub mod databases;
pub mod query_logs;
pub mod rows;
pub mod tables;
