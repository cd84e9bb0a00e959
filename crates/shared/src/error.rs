use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Validation,
    Transport,
    Remote,
}

/// User-displayable failure carried in events and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Error fields a generation backend may put in any response body.
///
/// Each field is read on its own so an oddly typed sibling never hides an
/// explicit error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendErrorBody {
    /// A truthy `error` field of any JSON type.
    pub flagged: bool,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl BackendErrorBody {
    pub fn from_payload(payload: &Value) -> Self {
        let error = payload.get("error");
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .and_then(non_blank)
            .or_else(|| {
                error
                    .and_then(|error| error.get("message"))
                    .and_then(Value::as_str)
                    .and_then(non_blank)
            });

        Self {
            flagged: error.is_some_and(is_truthy),
            error: error.and_then(Value::as_str).and_then(non_blank),
            message,
        }
    }

    /// Text for an explicit error: the `error` string, then any message.
    /// `None` when the body carries no truthy `error` field.
    pub fn explicit_error(&self) -> Option<Option<&str>> {
        self.flagged
            .then(|| self.error.as_deref().or(self.message.as_deref()))
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
