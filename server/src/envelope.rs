//! The `{ success, data | error }` wrapper around every response body.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::model::Todo;

/// Payload of a failed response: a message, or one message per field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(BTreeMap<String, String>),
}

/// Serialises as `{}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Empty {}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    List {
        success: bool,
        count: usize,
        data: Vec<Todo>,
    },
    Single {
        success: bool,
        data: Todo,
    },
    Deleted {
        success: bool,
        data: Empty,
    },
    Failure {
        success: bool,
        error: ErrorDetail,
    },
}

impl Envelope {
    pub fn list(todos: Vec<Todo>) -> Self {
        Self::List {
            success: true,
            count: todos.len(),
            data: todos,
        }
    }

    pub fn single(todo: Todo) -> Self {
        Self::Single {
            success: true,
            data: todo,
        }
    }

    pub fn deleted() -> Self {
        Self::Deleted {
            success: true,
            data: Empty {},
        }
    }

    pub fn failure(error: ErrorDetail) -> Self {
        Self::Failure {
            success: false,
            error,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::failure(ErrorDetail::Message(message.into()))
    }
}

/// An envelope with the status code it is sent under.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl Reply {
    pub const fn new(status: StatusCode, envelope: Envelope) -> Self {
        Self { status, envelope }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, Envelope::message(message))
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{now, ObjectId};
    use serde_json::json;

    fn todo() -> Todo {
        let at = now();
        Todo {
            id: ObjectId::from_bytes([1; 12]),
            title: "Test".to_string(),
            description: String::new(),
            completed: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn empty_list_shape() {
        let value = serde_json::to_value(Envelope::list(Vec::new())).unwrap();
        assert_eq!(value, json!({ "success": true, "count": 0, "data": [] }));
    }

    #[test]
    fn list_counts_its_items() {
        let value = serde_json::to_value(Envelope::list(vec![todo(), todo()])).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn single_shape_has_no_count() {
        let value = serde_json::to_value(Envelope::single(todo())).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], "010101010101010101010101");
        assert!(value.get("count").is_none());
    }

    #[test]
    fn deleted_carries_empty_object() {
        let value = serde_json::to_value(Envelope::deleted()).unwrap();
        assert_eq!(value, json!({ "success": true, "data": {} }));
    }

    #[test]
    fn message_failure_shape() {
        let value = serde_json::to_value(Envelope::message("Todo not found")).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "Todo not found" }));
    }

    #[test]
    fn field_failure_shape() {
        let fields = BTreeMap::from([("title".to_string(), "Please add a title".to_string())]);
        let envelope = Envelope::failure(ErrorDetail::Fields(fields));
        let value = serde_json::to_value(envelope).unwrap();
        assert_eq!(
            value,
            json!({ "success": false, "error": { "title": "Please add a title" } })
        );
    }
}
