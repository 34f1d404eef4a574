//! Connecting protocol: ask the agency to create a new connection.

use crate::context::Context;
use crate::envelope::Envelope;
use crate::instance::ProtocolInstance;
use crate::message_type::{spec_domain, EVERNYM_MSG_QUALIFIER};
use crate::AgentResult;

use super::Protocol;

pub const FAMILY: &str = "connecting";
pub const VERSION: &str = "0.6";

pub const CREATE_CONNECTION: &str = "CREATE_CONNECTION";
pub const GET_STATUS: &str = "get-status";

/// A connection invitation being created through the agency.
#[derive(Debug)]
pub struct Connecting {
    protocol: Protocol,
    source_id: String,
    phone_number: Option<String>,
    include_public_did: bool,
}

impl Connecting {
    pub fn new(
        source_id: impl Into<String>,
        phone_number: Option<String>,
        include_public_did: bool,
    ) -> Self {
        Self {
            protocol: Protocol::new(
                spec_domain(EVERNYM_MSG_QUALIFIER),
                FAMILY,
                VERSION,
                ProtocolInstance::initiate(),
            ),
            source_id: source_id.into(),
            phone_number,
            include_public_did,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn thread_id(&self) -> &str {
        self.protocol.thread_id()
    }

    pub fn connect_msg(&self) -> Envelope {
        let msg = self
            .protocol
            .envelope(CREATE_CONNECTION)
            .with_field("sourceId", self.source_id.as_str())
            .with_field("includePublicDID", self.include_public_did);
        match &self.phone_number {
            Some(phone) => msg.with_field("phoneNo", phone.as_str()),
            None => msg,
        }
    }

    pub fn connect_msg_packed(&self, ctx: &Context) -> AgentResult<Vec<u8>> {
        ctx.pack(&self.connect_msg())
    }

    pub async fn connect(&self, ctx: &Context) -> AgentResult<()> {
        ctx.send(&self.connect_msg()).await
    }

    pub fn status_msg(&self) -> Envelope {
        self.protocol
            .envelope(GET_STATUS)
            .with_field("sourceId", self.source_id.as_str())
    }

    pub fn status_msg_packed(&self, ctx: &Context) -> AgentResult<Vec<u8>> {
        ctx.pack(&self.status_msg())
    }

    pub async fn status(&self, ctx: &Context) -> AgentResult<()> {
        ctx.send(&self.status_msg()).await
    }
}
