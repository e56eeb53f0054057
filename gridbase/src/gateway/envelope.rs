//! The gateway wire envelope and its validation.
//!
//! Validation happens entirely before authentication: required fields,
//! action recognition, and action-specific presence/shape checks. A request
//! that fails here never touches the key store.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::rows::Document;
use crate::types::RowId;

use super::errors::GatewayError;

/// The four gateway actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Select => "select",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn parse(action: &str) -> Option<Self> {
        match action {
            "select" => Some(Action::Select),
            "insert" => Some(Action::Insert),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw request envelope. All fields optional at the serde level so that
/// missing-field errors are ours, not serde's.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct QueryEnvelope {
    pub api_key: Option<String>,
    pub action: Option<String>,
    pub table: Option<String>,
    /// Row document for insert; merge patch for update
    pub data: Option<Value>,
    /// Equality filters for select; values are compared against the string
    /// form of each document field
    pub filters: Option<HashMap<String, Value>>,
    /// Target row for update/delete
    pub row_id: Option<String>,
}

/// An envelope that passed validation: credentials, target table and a
/// fully-shaped row operation.
#[derive(Debug, Clone)]
pub struct ValidatedQuery {
    pub api_key: String,
    pub table: String,
    pub operation: RowOperation,
}

#[derive(Debug, Clone)]
pub enum RowOperation {
    Select { filters: HashMap<String, String> },
    Insert { data: Document },
    Update { row_id: RowId, patch: Document },
    Delete { row_id: RowId },
}

impl RowOperation {
    pub fn action(&self) -> Action {
        match self {
            RowOperation::Select { .. } => Action::Select,
            RowOperation::Insert { .. } => Action::Insert,
            RowOperation::Update { .. } => Action::Update,
            RowOperation::Delete { .. } => Action::Delete,
        }
    }
}

/// Filter values arrive as arbitrary JSON but compare as strings: strings
/// verbatim, everything else via its JSON text.
fn filter_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn require_document(data: Option<Value>, message: &str) -> Result<Document, GatewayError> {
    match data {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(GatewayError::InvalidPayload {
            message: message.to_string(),
        }),
    }
}

fn parse_row_id(row_id: Option<String>, message: &str) -> Result<RowId, GatewayError> {
    let Some(raw) = row_id.filter(|value| !value.is_empty()) else {
        return Err(GatewayError::InvalidPayload {
            message: message.to_string(),
        });
    };
    Uuid::parse_str(&raw).map_err(|_| GatewayError::MalformedEnvelope {
        message: "Invalid 'row_id': expected a UUID".to_string(),
    })
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

impl QueryEnvelope {
    /// Validate the envelope into a dispatchable query.
    pub fn validate(self) -> Result<ValidatedQuery, GatewayError> {
        let QueryEnvelope {
            api_key,
            action,
            table,
            data,
            filters,
            row_id,
        } = self;

        let (Some(api_key), Some(raw_action), Some(table)) = (non_empty(api_key), non_empty(action), non_empty(table)) else {
            return Err(GatewayError::MalformedEnvelope {
                message: "Missing required fields: api_key, action, table".to_string(),
            });
        };

        let action = Action::parse(&raw_action).ok_or(GatewayError::UnknownAction { action: raw_action })?;

        let operation = match action {
            Action::Select => RowOperation::Select {
                filters: filters
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(key, value)| (key, filter_text(&value)))
                    .collect(),
            },
            Action::Insert => RowOperation::Insert {
                data: require_document(data, "Missing 'data' object for insert")?,
            },
            Action::Update => {
                if row_id.as_deref().is_none_or(str::is_empty) || data.is_none() {
                    return Err(GatewayError::InvalidPayload {
                        message: "Missing 'row_id' and 'data' for update".to_string(),
                    });
                }
                RowOperation::Update {
                    row_id: parse_row_id(row_id, "Missing 'row_id' and 'data' for update")?,
                    patch: require_document(data, "Missing 'data' object for update")?,
                }
            }
            Action::Delete => RowOperation::Delete {
                row_id: parse_row_id(row_id, "Missing 'row_id' for delete")?,
            },
        };

        Ok(ValidatedQuery {
            api_key,
            table,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> QueryEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_required_fields_is_malformed() {
        for body in [
            json!({}),
            json!({"api_key": "gb_x", "action": "select"}),
            json!({"api_key": "", "action": "select", "table": "users"}),
        ] {
            let err = envelope(body).validate().unwrap_err();
            assert!(matches!(err, GatewayError::MalformedEnvelope { .. }));
        }
    }

    #[test]
    fn unknown_action_is_rejected_before_anything_else() {
        let err = envelope(json!({"api_key": "gb_x", "action": "upsert", "table": "users"}))
            .validate()
            .unwrap_err();
        match err {
            GatewayError::UnknownAction { action } => assert_eq!(action, "upsert"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn insert_requires_an_object_payload() {
        for data in [json!(null), json!("text"), json!([1, 2])] {
            let err = envelope(json!({"api_key": "gb_x", "action": "insert", "table": "users", "data": data}))
                .validate()
                .unwrap_err();
            assert!(matches!(err, GatewayError::InvalidPayload { .. }));
        }

        let query = envelope(json!({"api_key": "gb_x", "action": "insert", "table": "users", "data": {"name": "Ada"}}))
            .validate()
            .unwrap();
        assert!(matches!(query.operation, RowOperation::Insert { .. }));
    }

    #[test]
    fn update_requires_row_id_and_data() {
        let row_id = Uuid::new_v4().to_string();
        for body in [
            json!({"api_key": "gb_x", "action": "update", "table": "users", "data": {"a": 1}}),
            json!({"api_key": "gb_x", "action": "update", "table": "users", "row_id": row_id}),
        ] {
            let err = envelope(body).validate().unwrap_err();
            assert!(matches!(err, GatewayError::InvalidPayload { .. }));
        }
    }

    #[test]
    fn delete_requires_row_id() {
        let err = envelope(json!({"api_key": "gb_x", "action": "delete", "table": "users"}))
            .validate()
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPayload { .. }));
    }

    #[test]
    fn non_uuid_row_id_is_malformed() {
        let err = envelope(json!({"api_key": "gb_x", "action": "delete", "table": "users", "row_id": "nope"}))
            .validate()
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedEnvelope { .. }));
    }

    #[test]
    fn filter_values_coerce_to_their_text_form() {
        let query = envelope(json!({
            "api_key": "gb_x",
            "action": "select",
            "table": "users",
            "filters": {"name": "Ada", "age": 36, "active": true}
        }))
        .validate()
        .unwrap();

        let RowOperation::Select { filters } = query.operation else {
            panic!("expected select");
        };
        assert_eq!(filters["name"], "Ada");
        assert_eq!(filters["age"], "36");
        assert_eq!(filters["active"], "true");
    }
}
