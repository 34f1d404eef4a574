//! Issue-credential protocol.
//!
//! The initiator offers a credential and later issues it; a party that
//! joins an existing thread may only issue and query status.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::envelope::Envelope;
use crate::error::{AgentError, AgentResult};
use crate::instance::ProtocolInstance;
use crate::message_type::{spec_domain, EVERNYM_MSG_QUALIFIER};
use crate::state::{next_state, IssuanceEvent, IssuanceState};

use super::Protocol;

pub const FAMILY: &str = "issue-credential";
pub const VERSION: &str = "0.1";

pub const OFFER_CREDENTIAL: &str = "offer-credential";
pub const REQUEST_CREDENTIAL: &str = "request-credential";
pub const ISSUE_CREDENTIAL: &str = "issue-credential";
pub const GET_STATUS: &str = "get-status";

/// Credential terms carried by the offer.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialOffer {
    pub name: String,
    pub cred_def_id: String,
    pub values: BTreeMap<String, String>,
    pub price: String,
}

/// One credential issuance interaction.
#[derive(Debug)]
pub struct IssueCredential {
    protocol: Protocol,
    relationship: String,
    offer: Option<CredentialOffer>,
    state: IssuanceState,
}

impl IssueCredential {
    /// Start a new issuance for `relationship`.
    pub fn new(
        relationship: impl Into<String>,
        name: impl Into<String>,
        values: BTreeMap<String, String>,
        cred_def_id: impl Into<String>,
    ) -> Self {
        Self {
            protocol: Self::protocol(ProtocolInstance::initiate()),
            relationship: relationship.into(),
            offer: Some(CredentialOffer {
                name: name.into(),
                cred_def_id: cred_def_id.into(),
                values,
                price: "0".to_string(),
            }),
            state: IssuanceState::NotStarted,
        }
    }

    /// Continue an issuance the counterparty started on `thread_id`.
    pub fn join(relationship: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            protocol: Self::protocol(ProtocolInstance::join(thread_id)),
            relationship: relationship.into(),
            offer: None,
            state: IssuanceState::ThreadJoined,
        }
    }

    /// Set the offer price.
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        if let Some(offer) = self.offer.as_mut() {
            offer.price = price.into();
        }
        self
    }

    fn protocol(instance: ProtocolInstance) -> Protocol {
        Protocol::new(spec_domain(EVERNYM_MSG_QUALIFIER), FAMILY, VERSION, instance)
    }

    pub fn state(&self) -> IssuanceState {
        self.state
    }

    pub fn thread_id(&self) -> &str {
        self.protocol.thread_id()
    }

    pub fn relationship(&self) -> &str {
        &self.relationship
    }

    /// Build the offer message. Only the initiating party may offer.
    pub fn offer_credential_msg(&mut self) -> AgentResult<Envelope> {
        let (msg, state) = self.build_offer()?;
        self.commit(state);
        Ok(msg)
    }

    /// Pack the offer. The state advances only once packing succeeds.
    pub fn offer_credential_msg_packed(&mut self, ctx: &Context) -> AgentResult<Vec<u8>> {
        let (msg, state) = self.build_offer()?;
        let packed = ctx.pack(&msg)?;
        self.commit(state);
        Ok(packed)
    }

    /// Send the offer. The state advances only once delivery succeeds.
    pub async fn offer_credential(&mut self, ctx: &Context) -> AgentResult<()> {
        let (msg, state) = self.build_offer()?;
        ctx.send(&msg).await?;
        self.commit(state);
        Ok(())
    }

    fn build_offer(&self) -> AgentResult<(Envelope, IssuanceState)> {
        if !self.protocol.instance().started() {
            return Err(AgentError::IllegalOperation(
                "unable to offer credentials when not starting the interaction".to_string(),
            ));
        }
        let offer = self.offer.as_ref().ok_or_else(|| {
            AgentError::IllegalOperation("no credential terms to offer".to_string())
        })?;
        let state = next_state(self.state, IssuanceEvent::OfferBuilt)?;

        let msg = self
            .protocol
            .envelope(OFFER_CREDENTIAL)
            .with_relationship(self.relationship.as_str())
            .with_field("name", offer.name.as_str())
            .with_field("credDefId", offer.cred_def_id.as_str())
            .with_field("credentialValues", serde_json::to_value(&offer.values)?)
            .with_field("price", offer.price.as_str());
        Ok((msg, state))
    }

    /// Credential requests are driven by the holder, never by this side.
    pub fn request_credential_msg(&mut self) -> AgentResult<Envelope> {
        Err(AgentError::NotSupported(format!(
            "{} is not supported by the issuer",
            REQUEST_CREDENTIAL
        )))
    }

    pub fn request_credential_msg_packed(&mut self, ctx: &Context) -> AgentResult<Vec<u8>> {
        let msg = self.request_credential_msg()?;
        ctx.pack(&msg)
    }

    pub async fn request_credential(&mut self, ctx: &Context) -> AgentResult<()> {
        let msg = self.request_credential_msg()?;
        ctx.send(&msg).await
    }

    /// Build the issue message. Legal for either role.
    pub fn issue_credential_msg(&mut self) -> AgentResult<Envelope> {
        let (msg, state) = self.build_issue()?;
        self.commit(state);
        Ok(msg)
    }

    pub fn issue_credential_msg_packed(&mut self, ctx: &Context) -> AgentResult<Vec<u8>> {
        let (msg, state) = self.build_issue()?;
        let packed = ctx.pack(&msg)?;
        self.commit(state);
        Ok(packed)
    }

    /// Send the issue message.
    pub async fn issue_credential(&mut self, ctx: &Context) -> AgentResult<()> {
        let (msg, state) = self.build_issue()?;
        ctx.send(&msg).await?;
        self.commit(state);
        Ok(())
    }

    fn build_issue(&self) -> AgentResult<(Envelope, IssuanceState)> {
        let state = next_state(self.state, IssuanceEvent::IssueBuilt)?;
        let msg = self
            .protocol
            .envelope(ISSUE_CREDENTIAL)
            .with_relationship(self.relationship.as_str());
        Ok((msg, state))
    }

    /// Build the status query. Always legal.
    pub fn status_msg(&self) -> Envelope {
        self.protocol
            .envelope(GET_STATUS)
            .with_relationship(self.relationship.as_str())
    }

    pub fn status_msg_packed(&self, ctx: &Context) -> AgentResult<Vec<u8>> {
        ctx.pack(&self.status_msg())
    }

    /// Send the status query.
    pub async fn status(&self, ctx: &Context) -> AgentResult<()> {
        ctx.send(&self.status_msg()).await
    }

    fn commit(&mut self, state: IssuanceState) {
        if state != self.state {
            tracing::debug!(
                "Issuance {}: {:?} -> {:?}",
                self.thread_id(),
                self.state,
                state
            );
        }
        self.state = state;
    }
}
