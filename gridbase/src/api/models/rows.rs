//! API models for the row explorer.

use serde::Deserialize;
use utoipa::IntoParams;

fn default_limit() -> i64 {
    50
}

/// Pagination for the row explorer, by creation order
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RowListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
