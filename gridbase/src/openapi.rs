//! OpenAPI document assembly.
//!
//! Served as JSON at `/api-docs/openapi.json` with an interactive docs page
//! at `/docs`.

use utoipa::OpenApi;

use crate::api::models::{
    api_keys::{ApiKeyCreate, ApiKeyResponse},
    databases::{DatabaseCreate, DatabaseResponse},
    query_logs::QueryLogResponse,
    tables::{ColumnCreate, ColumnResponse, TableCreate, TableResponse},
};
use crate::gateway::envelope::{Action, QueryEnvelope};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "gridbase",
        description = "Self-service tables behind one generic, API-key-authenticated data endpoint"
    ),
    paths(
        crate::gateway::dispatcher::handle_query,
        crate::api::handlers::databases::create_database,
        crate::api::handlers::databases::list_databases,
        crate::api::handlers::databases::get_database,
        crate::api::handlers::databases::delete_database,
        crate::api::handlers::tables::create_table,
        crate::api::handlers::tables::list_tables,
        crate::api::handlers::tables::delete_table,
        crate::api::handlers::tables::add_column,
        crate::api::handlers::tables::list_columns,
        crate::api::handlers::rows::list_rows,
        crate::api::handlers::rows::replace_row,
        crate::api::handlers::rows::delete_row,
        crate::api::handlers::api_keys::create_api_key,
        crate::api::handlers::api_keys::list_api_keys,
        crate::api::handlers::api_keys::regenerate_api_key,
        crate::api::handlers::api_keys::activate_api_key,
        crate::api::handlers::api_keys::deactivate_api_key,
        crate::api::handlers::api_keys::delete_api_key,
        crate::api::handlers::query_logs::list_query_logs,
        crate::api::handlers::query_logs::clear_query_logs,
    ),
    components(schemas(
        Action,
        QueryEnvelope,
        DatabaseCreate,
        DatabaseResponse,
        TableCreate,
        TableResponse,
        ColumnCreate,
        ColumnResponse,
        ApiKeyCreate,
        ApiKeyResponse,
        QueryLogResponse,
    )),
    tags(
        (name = "gateway", description = "The generic data-access endpoint"),
        (name = "databases", description = "Database management"),
        (name = "tables", description = "Table and column management"),
        (name = "rows", description = "Row explorer"),
        (name = "api_keys", description = "API key management"),
        (name = "query_logs", description = "Gateway audit log"),
    )
)]
pub struct ApiDoc;
