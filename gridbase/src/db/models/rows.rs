//! Storage models for rows.
//!
//! Rows are open documents: a flat JSON object mapping field names to
//! arbitrary JSON values. Column membership is never enforced at write time.

use crate::types::{RowId, TableId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::FromRow;

/// A row's user-supplied fields: top-level keys map to scalar or JSON values.
pub type Document = Map<String, Value>;

/// A stored row with its system metadata.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RowRecord {
    pub id: RowId,
    pub table_id: TableId,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RowRecord {
    /// Flatten into the wire shape: the row id and timestamps injected as
    /// sibling keys alongside the stored fields.
    ///
    /// `{"id": …, <data fields…>, "_created_at": …, "_updated_at": …}`
    pub fn flatten(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".to_string(), json!(self.id));
        if let Value::Object(fields) = &self.data {
            for (key, value) in fields {
                out.insert(key.clone(), value.clone());
            }
        }
        out.insert("_created_at".to_string(), json!(self.created_at));
        out.insert("_updated_at".to_string(), json!(self.updated_at));
        Value::Object(out)
    }
}

/// Overlay `patch` onto `existing`, top-level keys only.
///
/// Keys present in the patch overwrite or add; keys absent from the patch are
/// carried over untouched. Nested objects are replaced wholesale, never
/// merged recursively (matches Postgres `||` on jsonb).
pub fn shallow_merge(existing: &Value, patch: &Document) -> Value {
    let mut merged = match existing {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_shallow_merge_preserves_unspecified_keys() {
        let existing = json!({"name": "Ada", "email": "a@x.com"});
        let merged = shallow_merge(&existing, &doc(json!({"name": "Ada L."})));
        assert_eq!(merged, json!({"name": "Ada L.", "email": "a@x.com"}));
    }

    #[test]
    fn test_shallow_merge_adds_new_keys() {
        let existing = json!({"name": "Ada L."});
        let merged = shallow_merge(&existing, &doc(json!({"email": "a@x.com"})));
        assert_eq!(merged, json!({"name": "Ada L.", "email": "a@x.com"}));
    }

    #[test]
    fn test_shallow_merge_replaces_nested_objects_wholesale() {
        let existing = json!({"meta": {"a": 1, "b": 2}});
        let merged = shallow_merge(&existing, &doc(json!({"meta": {"c": 3}})));
        // Not a recursive merge: the nested object is replaced, not combined
        assert_eq!(merged, json!({"meta": {"c": 3}}));
    }

    #[test]
    fn test_flatten_injects_id_and_timestamps() {
        let row = RowRecord {
            id: uuid::Uuid::new_v4(),
            table_id: uuid::Uuid::new_v4(),
            data: json!({"name": "Ada"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let flat = row.flatten();
        assert_eq!(flat["id"], json!(row.id));
        assert_eq!(flat["name"], json!("Ada"));
        assert!(flat.get("_created_at").is_some());
        assert!(flat.get("_updated_at").is_some());
        // table_id is internal and never exposed in the flattened shape
        assert!(flat.get("table_id").is_none());
    }
}
