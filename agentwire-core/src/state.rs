//! State machine definitions for credential issuance.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

/// Issuance states, as seen by one party of the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuanceState {
    /// Initiator, nothing sent yet.
    NotStarted,
    /// Initiator has offered the credential.
    Offered,
    /// Responder, entered on a thread the counterparty started.
    ThreadJoined,
    /// Credential issued. Terminal.
    Issued,
}

impl IssuanceState {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Issued)
    }

    /// Get valid transitions from current state.
    ///
    /// Self-transitions allow a step's message to be rebuilt, e.g. packed
    /// for inspection and then sent.
    pub fn valid_transitions(&self) -> &'static [IssuanceState] {
        match self {
            Self::NotStarted => &[Self::Offered, Self::Issued],
            Self::Offered => &[Self::Offered, Self::Issued],
            Self::ThreadJoined => &[Self::Issued],
            Self::Issued => &[Self::Issued],
        }
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: IssuanceState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

/// Events that drive issuance state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceEvent {
    /// Offer message built.
    OfferBuilt,
    /// Issue message built.
    IssueBuilt,
}

impl IssuanceEvent {
    fn target(&self) -> IssuanceState {
        match self {
            Self::OfferBuilt => IssuanceState::Offered,
            Self::IssueBuilt => IssuanceState::Issued,
        }
    }
}

/// Compute the state after `event`, or fail with `IllegalOperation`.
pub fn next_state(current: IssuanceState, event: IssuanceEvent) -> AgentResult<IssuanceState> {
    let target = event.target();
    if current.can_transition_to(target) {
        Ok(target)
    } else {
        Err(AgentError::IllegalOperation(format!(
            "invalid issuance transition: {:?} -> {:?} on {:?}",
            current, target, event
        )))
    }
}
