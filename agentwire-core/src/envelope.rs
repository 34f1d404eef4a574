//! Outbound message envelopes.
//!
//! An [`Envelope`] holds the fields every protocol message shares
//! (`@type`, `@id`, `~thread`, `~for_relationship`); protocol steps merge
//! their payload fields in at the same level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AgentResult;
use crate::instance::ProtocolInstance;
use crate::message_type::{spec_domain, MessageType, EVERNYM_MSG_QUALIFIER};

/// Routing family used to forward packed messages through the agency.
pub const FORWARD_FAMILY: &str = "routing";
pub const FORWARD_VERSION: &str = "1.0";
pub const FORWARD_KIND: &str = "FWD";

/// Fresh unique message id (UUID v4).
pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Thread decorator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thid: String,
}

/// Outbound protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(rename = "~for_relationship", skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope with a fresh id and no payload.
    pub fn new(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            id: new_message_id(),
            thread: None,
            relationship: None,
            payload: Map::new(),
        }
    }

    /// Attach the instance's thread, binding one if it has none yet.
    pub fn attach_thread(&mut self, instance: &ProtocolInstance) {
        self.thread = Some(Thread {
            thid: instance.thread_id().to_string(),
        });
    }

    /// Builder form of [`Envelope::attach_thread`].
    pub fn in_thread(mut self, instance: &ProtocolInstance) -> Self {
        self.attach_thread(instance);
        self
    }

    /// Set the relationship this message is sent for.
    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    /// Add a top-level payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Thread id, if a thread is attached.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.thid.as_str())
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> AgentResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> AgentResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Wrap an already packed message for delivery to `to` via the agency.
pub fn forward(to: impl Into<String>, packed: &[u8]) -> AgentResult<Envelope> {
    let inner: Value = serde_json::from_slice(packed)?;
    let msg_type = MessageType::new(
        spec_domain(EVERNYM_MSG_QUALIFIER),
        FORWARD_FAMILY,
        FORWARD_VERSION,
        FORWARD_KIND,
    );
    let to: String = to.into();
    Ok(Envelope::new(msg_type)
        .with_field("@fwd", to)
        .with_field("@msg", inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_type() -> MessageType {
        MessageType::new("a", "b", "0.1", "x")
    }

    #[test]
    fn envelope_serialization() {
        let instance = ProtocolInstance::with_thread_id("t-1");
        let env = Envelope::new(sample_type())
            .in_thread(&instance)
            .with_relationship("rel-1")
            .with_field("name", "Degree")
            .with_field("price", "0");

        let value = env.to_value().unwrap();
        assert_eq!(value["@type"], "a/b/0.1/x");
        assert_eq!(value["@id"], env.id.as_str());
        assert_eq!(value["~thread"]["thid"], "t-1");
        assert_eq!(value["~for_relationship"], "rel-1");
        assert_eq!(value["name"], "Degree");

        let parsed: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn optional_decorators_omitted() {
        let value = Envelope::new(sample_type()).to_value().unwrap();
        assert!(value.get("~thread").is_none());
        assert!(value.get("~for_relationship").is_none());
    }

    #[test]
    fn attach_thread_is_idempotent() {
        let instance = ProtocolInstance::initiate();
        let mut env = Envelope::new(sample_type());
        env.attach_thread(&instance);
        let first = env.thread_id().unwrap().to_string();
        env.attach_thread(&instance);
        assert_eq!(env.thread_id(), Some(first.as_str()));

        let other = Envelope::new(sample_type()).in_thread(&instance);
        assert_eq!(other.thread_id(), Some(first.as_str()));
        assert_ne!(other.id, env.id);
    }

    #[test]
    fn forward_wraps_packed() {
        let packed = br#"{"payload":"abc"}"#;
        let fwd = forward("did:peer:1", packed).unwrap();
        assert_eq!(fwd.msg_type.family, FORWARD_FAMILY);
        assert_eq!(fwd.msg_type.kind, FORWARD_KIND);
        assert_eq!(fwd.payload["@fwd"], "did:peer:1");
        assert_eq!(fwd.payload["@msg"]["payload"], "abc");
    }
}
