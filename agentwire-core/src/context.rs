//! Outbound context: the wallet and transport a protocol step sends through.

use std::sync::Arc;

use crate::envelope::{forward, Envelope};
use crate::error::AgentResult;
use crate::transport::Transport;
use crate::wallet::Wallet;

/// Wallet + transport pair used by protocol steps.
#[derive(Clone)]
pub struct Context {
    wallet: Arc<dyn Wallet>,
    transport: Arc<dyn Transport>,
    route_to: Option<String>,
}

impl Context {
    /// Create a context that sends packed messages directly.
    pub fn new(wallet: Arc<dyn Wallet>, transport: Arc<dyn Transport>) -> Self {
        Self {
            wallet,
            transport,
            route_to: None,
        }
    }

    /// Forward every packed message to `did` through the agency.
    pub fn with_route(mut self, did: impl Into<String>) -> Self {
        self.route_to = Some(did.into());
        self
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    /// Pack an envelope, wrapping it in a forward message when routed.
    pub fn pack(&self, envelope: &Envelope) -> AgentResult<Vec<u8>> {
        let packed = self.wallet.pack(&envelope.to_value()?)?;
        match &self.route_to {
            Some(did) => {
                let fwd = forward(did.as_str(), &packed)?;
                self.wallet.pack(&fwd.to_value()?)
            }
            None => Ok(packed),
        }
    }

    /// Pack and send an envelope.
    pub async fn send(&self, envelope: &Envelope) -> AgentResult<()> {
        let packed = self.pack(envelope)?;
        tracing::debug!(
            "Sending {} ({}), {} bytes",
            envelope.msg_type,
            envelope.id,
            packed.len()
        );
        self.transport.send(&packed).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("route_to", &self.route_to)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::message_type::MessageType;

    fn sample() -> Envelope {
        Envelope::new(MessageType::new("a", "b", "0.1", "x")).with_field("k", "v")
    }

    #[tokio::test]
    async fn send_packs_for_peer() {
        let (ctx, transport, agency) = recording_context();
        let env = sample();
        ctx.send(&env).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let msg = agency.unpack(&sent[0]).unwrap();
        assert_eq!(msg["@id"], env.id.as_str());
        assert_eq!(msg["k"], "v");
    }

    #[tokio::test]
    async fn routed_send_wraps_forward() {
        let (ctx, transport, agency) = recording_context();
        let ctx = ctx.with_route("did:pairwise:verity");
        ctx.send(&sample()).await.unwrap();

        let outer = agency.unpack(&transport.sent()[0]).unwrap();
        assert!(outer["@type"].as_str().unwrap().ends_with("/routing/1.0/FWD"));
        assert_eq!(outer["@fwd"], "did:pairwise:verity");

        let inner_packed = serde_json::to_vec(&outer["@msg"]).unwrap();
        let inner = agency.unpack(&inner_packed).unwrap();
        assert_eq!(inner["k"], "v");
    }

    #[tokio::test]
    async fn transport_failure_surfaces() {
        let (sdk, _agency) = wallet_pair();
        let ctx = Context::new(sdk, Arc::new(RecordingTransport::failing()));

        let err = ctx.send(&sample()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::IoFailure);
    }
}
