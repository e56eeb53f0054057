//! PostgreSQL storage backend.
//!
//! Queries are runtime-checked (`sqlx::query_as`) rather than macro-checked
//! so the crate builds without a live database. Rows are JSONB documents;
//! the shallow merge is pushed down as a single `data || $patch` statement,
//! which gives read-committed last-writer-wins semantics without any
//! gateway-side locking.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use crate::crypto::generate_api_key;
use crate::db::errors::Result;
use crate::db::models::{
    api_keys::{ApiKey, ApiKeyCreateDBRequest, KeyAuth},
    databases::{Database, DatabaseCreateDBRequest},
    query_logs::{QueryLogCreate, QueryLogEntry, QueryLogFilter},
    rows::{Document, RowRecord},
    tables::{ColumnDef, ColumnSpec, TableCreateDBRequest, TableDef},
};
use crate::types::{abbrev_uuid, ApiKeyId, DatabaseId, RowId, TableId, UserId};

use super::store::{Datastore, SELECT_ROW_LIMIT};

const API_KEY_COLUMNS: &str = "id, database_id, user_id, name, key_value, is_active, last_used_at, created_at";
const ROW_COLUMNS: &str = "id, table_id, data, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Datastore for PgStore {
    #[instrument(skip(self, secret), err)]
    async fn authenticate(&self, secret: &str) -> Result<Option<KeyAuth>> {
        let row = sqlx::query_as::<Postgres, (ApiKeyId, DatabaseId, UserId)>(
            "SELECT id, database_id, user_id FROM api_keys WHERE key_value = $1 AND is_active = TRUE",
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(key_id, database_id, user_id)| KeyAuth {
            key_id,
            database_id,
            user_id,
        }))
    }

    #[instrument(skip(self), fields(api_key_id = %abbrev_uuid(&id)), err)]
    async fn touch_api_key(&self, id: ApiKeyId) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create_api_key(&self, request: &ApiKeyCreateDBRequest) -> Result<ApiKey> {
        let secret = generate_api_key();

        let key = sqlx::query_as::<Postgres, ApiKey>(&format!(
            "INSERT INTO api_keys (database_id, user_id, name, key_value) \
             VALUES ($1, $2, $3, $4) RETURNING {API_KEY_COLUMNS}"
        ))
        .bind(request.database_id)
        .bind(request.user_id)
        .bind(&request.name)
        .bind(secret)
        .fetch_one(&self.pool)
        .await?;

        Ok(key)
    }

    #[instrument(skip(self), fields(api_key_id = %abbrev_uuid(&id)), err)]
    async fn get_api_key(&self, id: ApiKeyId) -> Result<Option<ApiKey>> {
        let key = sqlx::query_as::<Postgres, ApiKey>(&format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(key)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    async fn list_api_keys(&self, user_id: UserId) -> Result<Vec<ApiKey>> {
        let keys = sqlx::query_as::<Postgres, ApiKey>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    #[instrument(skip(self), fields(api_key_id = %abbrev_uuid(&id)), err)]
    async fn regenerate_api_key(&self, id: ApiKeyId) -> Result<Option<ApiKey>> {
        let secret = generate_api_key();

        let key = sqlx::query_as::<Postgres, ApiKey>(&format!(
            "UPDATE api_keys SET key_value = $2 WHERE id = $1 RETURNING {API_KEY_COLUMNS}"
        ))
        .bind(id)
        .bind(secret)
        .fetch_optional(&self.pool)
        .await?;
        Ok(key)
    }

    #[instrument(skip(self), fields(api_key_id = %abbrev_uuid(&id), active), err)]
    async fn set_api_key_active(&self, id: ApiKeyId, active: bool) -> Result<Option<ApiKey>> {
        let key = sqlx::query_as::<Postgres, ApiKey>(&format!(
            "UPDATE api_keys SET is_active = $2 WHERE id = $1 RETURNING {API_KEY_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(key)
    }

    #[instrument(skip(self), fields(api_key_id = %abbrev_uuid(&id)), err)]
    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create_database(&self, request: &DatabaseCreateDBRequest) -> Result<Database> {
        let database = sqlx::query_as::<Postgres, Database>(
            "INSERT INTO databases (user_id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, user_id, name, description, status, created_at",
        )
        .bind(request.user_id)
        .bind(&request.name)
        .bind(&request.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(database)
    }

    #[instrument(skip(self), fields(database_id = %abbrev_uuid(&id)), err)]
    async fn get_database(&self, id: DatabaseId) -> Result<Option<Database>> {
        let database = sqlx::query_as::<Postgres, Database>(
            "SELECT id, user_id, name, description, status, created_at FROM databases WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(database)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    async fn list_databases(&self, user_id: UserId) -> Result<Vec<Database>> {
        let databases = sqlx::query_as::<Postgres, Database>(
            "SELECT id, user_id, name, description, status, created_at FROM databases \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(databases)
    }

    #[instrument(skip(self), fields(database_id = %abbrev_uuid(&id)), err)]
    async fn delete_database(&self, id: DatabaseId) -> Result<bool> {
        // Tables, columns, rows, keys and logs go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM databases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(database_id = %abbrev_uuid(&database_id), table = name), err)]
    async fn resolve_table(&self, database_id: DatabaseId, name: &str) -> Result<Option<TableId>> {
        let table_id = sqlx::query_scalar::<Postgres, TableId>(
            "SELECT id FROM database_tables WHERE database_id = $1 AND name = $2",
        )
        .bind(database_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(table_id)
    }

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create_table(&self, request: &TableCreateDBRequest) -> Result<TableDef> {
        let mut tx = self.pool.begin().await?;

        let table = sqlx::query_as::<Postgres, TableDef>(
            "INSERT INTO database_tables (database_id, name) VALUES ($1, $2) \
             RETURNING id, database_id, name, created_at",
        )
        .bind(request.database_id)
        .bind(&request.name)
        .fetch_one(&mut *tx)
        .await?;

        for (position, spec) in request.columns.iter().enumerate() {
            sqlx::query(
                "INSERT INTO table_columns (table_id, name, data_type, is_nullable, default_value, position) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(table.id)
            .bind(&spec.name)
            .bind(&spec.data_type)
            .bind(spec.is_nullable)
            .bind(&spec.default_value)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(table)
    }

    #[instrument(skip(self), fields(table_id = %abbrev_uuid(&id)), err)]
    async fn get_table(&self, id: TableId) -> Result<Option<TableDef>> {
        let table = sqlx::query_as::<Postgres, TableDef>(
            "SELECT id, database_id, name, created_at FROM database_tables WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(table)
    }

    #[instrument(skip(self), fields(database_id = %abbrev_uuid(&database_id)), err)]
    async fn list_tables(&self, database_id: DatabaseId) -> Result<Vec<TableDef>> {
        let tables = sqlx::query_as::<Postgres, TableDef>(
            "SELECT id, database_id, name, created_at FROM database_tables \
             WHERE database_id = $1 ORDER BY created_at ASC",
        )
        .bind(database_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    #[instrument(skip(self), fields(table_id = %abbrev_uuid(&id)), err)]
    async fn delete_table(&self, id: TableId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM database_tables WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, spec), fields(table_id = %abbrev_uuid(&table_id), column = %spec.name), err)]
    async fn add_column(&self, table_id: TableId, spec: &ColumnSpec) -> Result<ColumnDef> {
        let column = sqlx::query_as::<Postgres, ColumnDef>(
            "INSERT INTO table_columns (table_id, name, data_type, is_nullable, default_value, position) \
             VALUES ($1, $2, $3, $4, $5, \
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM table_columns WHERE table_id = $1)) \
             RETURNING id, table_id, name, data_type, is_nullable, default_value, position",
        )
        .bind(table_id)
        .bind(&spec.name)
        .bind(&spec.data_type)
        .bind(spec.is_nullable)
        .bind(&spec.default_value)
        .fetch_one(&self.pool)
        .await?;
        Ok(column)
    }

    #[instrument(skip(self), fields(table_id = %abbrev_uuid(&table_id)), err)]
    async fn list_columns(&self, table_id: TableId) -> Result<Vec<ColumnDef>> {
        let columns = sqlx::query_as::<Postgres, ColumnDef>(
            "SELECT id, table_id, name, data_type, is_nullable, default_value, position \
             FROM table_columns WHERE table_id = $1 ORDER BY position ASC",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    #[instrument(skip(self, filters), fields(table_id = %abbrev_uuid(&table_id), filters = filters.len()), err)]
    async fn select_rows(&self, table_id: TableId, filters: &HashMap<String, String>) -> Result<Vec<RowRecord>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ROW_COLUMNS} FROM table_rows WHERE table_id = "
        ));
        query.push_bind(table_id);
        for (key, value) in filters {
            query.push(" AND data ->> ");
            query.push_bind(key.as_str());
            query.push(" = ");
            query.push_bind(value.as_str());
        }
        query.push(" ORDER BY created_at ASC LIMIT ");
        query.push_bind(SELECT_ROW_LIMIT);

        let rows = query.build_query_as::<RowRecord>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(table_id = %abbrev_uuid(&table_id), offset = skip, limit), err)]
    async fn list_rows(&self, table_id: TableId, skip: i64, limit: i64) -> Result<Vec<RowRecord>> {
        let rows = sqlx::query_as::<Postgres, RowRecord>(&format!(
            "SELECT {ROW_COLUMNS} FROM table_rows WHERE table_id = $1 \
             ORDER BY created_at ASC OFFSET $2 LIMIT $3"
        ))
        .bind(table_id)
        .bind(skip.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self, data), fields(table_id = %abbrev_uuid(&table_id)), err)]
    async fn insert_row(&self, table_id: TableId, data: Document) -> Result<RowRecord> {
        let row = sqlx::query_as::<Postgres, RowRecord>(&format!(
            "INSERT INTO table_rows (table_id, data) VALUES ($1, $2) RETURNING {ROW_COLUMNS}"
        ))
        .bind(table_id)
        .bind(serde_json::Value::Object(data))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self, patch), fields(table_id = %abbrev_uuid(&table_id), row_id = %abbrev_uuid(&row_id)), err)]
    async fn merge_row(&self, table_id: TableId, row_id: RowId, patch: Document) -> Result<Option<RowRecord>> {
        // Single-statement top-level merge; concurrent merges are
        // last-writer-wins per key under read committed.
        let row = sqlx::query_as::<Postgres, RowRecord>(&format!(
            "UPDATE table_rows SET data = data || $3::jsonb, updated_at = NOW() \
             WHERE id = $2 AND table_id = $1 RETURNING {ROW_COLUMNS}"
        ))
        .bind(table_id)
        .bind(row_id)
        .bind(serde_json::Value::Object(patch))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self, data), fields(table_id = %abbrev_uuid(&table_id), row_id = %abbrev_uuid(&row_id)), err)]
    async fn replace_row(&self, table_id: TableId, row_id: RowId, data: Document) -> Result<Option<RowRecord>> {
        let row = sqlx::query_as::<Postgres, RowRecord>(&format!(
            "UPDATE table_rows SET data = $3, updated_at = NOW() \
             WHERE id = $2 AND table_id = $1 RETURNING {ROW_COLUMNS}"
        ))
        .bind(table_id)
        .bind(row_id)
        .bind(serde_json::Value::Object(data))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self), fields(table_id = %abbrev_uuid(&table_id), row_id = %abbrev_uuid(&row_id)), err)]
    async fn delete_row(&self, table_id: TableId, row_id: RowId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM table_rows WHERE id = $2 AND table_id = $1")
            .bind(table_id)
            .bind(row_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, entry), fields(method = %entry.method, status = entry.status_code), err)]
    async fn record_query_log(&self, entry: &QueryLogCreate) -> Result<()> {
        sqlx::query(
            "INSERT INTO query_logs (database_id, user_id, method, endpoint, status_code, response_time_ms, request_body) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.database_id)
        .bind(entry.user_id)
        .bind(&entry.method)
        .bind(&entry.endpoint)
        .bind(entry.status_code)
        .bind(entry.response_time_ms)
        .bind(&entry.request_body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit), err)]
    async fn list_query_logs(&self, filter: &QueryLogFilter) -> Result<Vec<QueryLogEntry>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, database_id, user_id, method, endpoint, status_code, response_time_ms, request_body, created_at \
             FROM query_logs WHERE TRUE",
        );
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ");
            query.push_bind(user_id);
        }
        if let Some(database_id) = filter.database_id {
            query.push(" AND database_id = ");
            query.push_bind(database_id);
        }
        if let Some(method) = filter.method.as_deref() {
            query.push(" AND method = ");
            query.push_bind(method);
        }
        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(filter.limit.max(0));

        let logs = query.build_query_as::<QueryLogEntry>().fetch_all(&self.pool).await?;
        Ok(logs)
    }

    #[instrument(skip(self), err)]
    async fn clear_query_logs(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM query_logs").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    async fn seed(store: &PgStore) -> (DatabaseId, TableId) {
        let database = store
            .create_database(&DatabaseCreateDBRequest {
                user_id: Uuid::new_v4(),
                name: "app".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let table = store
            .create_table(&TableCreateDBRequest {
                database_id: database.id,
                name: "users".to_string(),
                columns: vec![ColumnSpec {
                    name: "name".to_string(),
                    data_type: "text".to_string(),
                    is_nullable: false,
                    default_value: None,
                }],
            })
            .await
            .unwrap();
        (database.id, table.id)
    }

    #[sqlx::test]
    async fn authenticate_resolves_active_keys_only(pool: PgPool) {
        let store = PgStore::new(pool);
        let (database_id, _) = seed(&store).await;
        let key = store
            .create_api_key(&ApiKeyCreateDBRequest {
                database_id,
                user_id: Uuid::new_v4(),
                name: "Default".to_string(),
            })
            .await
            .unwrap();

        let auth = store.authenticate(&key.key_value).await.unwrap().unwrap();
        assert_eq!(auth.database_id, database_id);

        store.set_api_key_active(key.id, false).await.unwrap();
        assert!(store.authenticate(&key.key_value).await.unwrap().is_none());
        assert!(store.authenticate("gb_unknown").await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn merge_preserves_untouched_keys_and_misses_are_none(pool: PgPool) {
        let store = PgStore::new(pool);
        let (_, table_id) = seed(&store).await;
        let row = store
            .insert_row(table_id, doc(json!({"name": "Ada", "email": "a@x.com"})))
            .await
            .unwrap();

        let merged = store
            .merge_row(table_id, row.id, doc(json!({"name": "Ada L."})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.data["name"], json!("Ada L."));
        assert_eq!(merged.data["email"], json!("a@x.com"));

        assert!(store
            .merge_row(table_id, Uuid::new_v4(), doc(json!({"a": 1})))
            .await
            .unwrap()
            .is_none());
    }

    #[sqlx::test]
    async fn select_filters_and_scoping(pool: PgPool) {
        let store = PgStore::new(pool);
        let (_, table_id) = seed(&store).await;
        store.insert_row(table_id, doc(json!({"name": "Ada"}))).await.unwrap();
        store.insert_row(table_id, doc(json!({"name": "Grace"}))).await.unwrap();

        let mut filters = HashMap::new();
        filters.insert("name".to_string(), "Ada".to_string());
        let rows = store.select_rows(table_id, &filters).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data["name"], json!("Ada"));

        // delete is not idempotent
        assert!(store.delete_row(table_id, rows[0].id).await.unwrap());
        assert!(!store.delete_row(table_id, rows[0].id).await.unwrap());
    }

    #[sqlx::test]
    async fn duplicate_table_name_is_a_unique_violation(pool: PgPool) {
        let store = PgStore::new(pool);
        let (database_id, _) = seed(&store).await;
        let err = store
            .create_table(&TableCreateDBRequest {
                database_id,
                name: "users".to_string(),
                columns: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
