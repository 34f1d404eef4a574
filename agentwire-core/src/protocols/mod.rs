//! Protocol families built on the envelope builder.
//!
//! Each family wraps a [`Protocol`], which knows the family's `@type`
//! prefix and the [`ProtocolInstance`] (thread) its messages belong to.

pub mod connecting;
pub mod issue_credential;
pub mod question;

pub use connecting::Connecting;
pub use issue_credential::IssueCredential;
pub use question::Question;

use crate::envelope::Envelope;
use crate::instance::ProtocolInstance;
use crate::message_type::MessageType;

/// Family identity plus the thread its messages are sent on.
#[derive(Debug)]
pub struct Protocol {
    domain: String,
    family: String,
    version: String,
    instance: ProtocolInstance,
}

impl Protocol {
    pub fn new(
        domain: impl Into<String>,
        family: impl Into<String>,
        version: impl Into<String>,
        instance: ProtocolInstance,
    ) -> Self {
        Self {
            domain: domain.into(),
            family: family.into(),
            version: version.into(),
            instance,
        }
    }

    /// `@type` for a message of this family.
    pub fn message_type(&self, kind: &str) -> MessageType {
        MessageType::new(
            self.domain.as_str(),
            self.family.as_str(),
            self.version.as_str(),
            kind,
        )
    }

    /// Fresh envelope of `kind`, threaded on this instance.
    pub fn envelope(&self, kind: &str) -> Envelope {
        Envelope::new(self.message_type(kind)).in_thread(&self.instance)
    }

    pub fn instance(&self) -> &ProtocolInstance {
        &self.instance
    }

    pub fn thread_id(&self) -> &str {
        self.instance.thread_id()
    }
}
