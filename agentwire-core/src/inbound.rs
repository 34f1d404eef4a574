//! Inbound (decrypted) messages.

use serde_json::{Map, Value};

use crate::error::{AgentError, AgentResult};
use crate::message_type::MessageType;

/// A decrypted message as handed to handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    fields: Map<String, Value>,
}

impl InboundMessage {
    /// Wrap a decrypted JSON document. Must be an object.
    pub fn from_value(value: Value) -> AgentResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(AgentError::InvalidMessageFormat(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> AgentResult<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Raw `@type` string.
    pub fn message_type(&self) -> AgentResult<&str> {
        self.fields
            .get("@type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AgentError::InvalidMessageFormat("missing string field @type".to_string())
            })
    }

    /// `@type` parsed into its four segments.
    pub fn parsed_type(&self) -> AgentResult<MessageType> {
        self.message_type()?.parse()
    }

    /// `@id`, if present.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("@id").and_then(Value::as_str)
    }

    /// Integer `status` field, if present.
    pub fn status(&self) -> Option<i64> {
        self.fields.get("status").and_then(Value::as_i64)
    }

    /// Thread id from `~thread.thid`, falling back to `thread.thid`.
    pub fn thread_id(&self) -> Option<&str> {
        ["~thread", "thread"].iter().find_map(|key| {
            self.fields
                .get(*key)
                .and_then(|t| t.get("thid"))
                .and_then(Value::as_str)
        })
    }

    /// Any top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All top-level fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
