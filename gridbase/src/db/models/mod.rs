//! Storage-layer entity models and request types.

pub mod api_keys;
pub mod databases;
pub mod query_logs;
pub mod rows;
pub mod tables;
