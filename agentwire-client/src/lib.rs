//! agentwire client SDK.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentwire_client::{AgentClient, ClientConfig};
//! use agentwire_core::protocols::question::{self, Question};
//! use agentwire_core::Handlers;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AgentClient::new(ClientConfig::from_file("agentwire.json")?)?;
//!
//!     let mut handlers = Handlers::builder();
//!     handlers.add_status_handler(
//!         question::Question::status_type().to_string(),
//!         question::QUESTION_ANSWERED_STATUS,
//!         |msg| {
//!             println!("Answered: {:?}", msg.get("answer"));
//!             Ok(())
//!         },
//!     );
//!     let endpoint = client.endpoint(Arc::new(handlers.build())).await?;
//!     tokio::spawn(endpoint.run());
//!
//!     let question = Question::new("conn-1", "Hi", "Is it you?", "", ["Yes", "No"]);
//!     question.ask(client.context()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod endpoint;
mod frame;

pub use config::{ClientConfig, TlsConfig};
pub use connection::{Connection, ConnectionConfig, TcpTransport, DEFAULT_MAX_MESSAGE_SIZE};
pub use endpoint::{handle_stream, Endpoint};
pub use frame::{read_frame, write_frame};

use std::sync::Arc;

use agentwire_core::{AgentResult, Context, Handlers, LocalWallet, Wallet};

/// High-level agentwire client: wallet, agency transport and endpoint.
pub struct AgentClient {
    config: ClientConfig,
    wallet: Arc<LocalWallet>,
    context: Context,
}

impl AgentClient {
    /// Open the wallet and prepare the agency transport.
    pub fn new(config: ClientConfig) -> AgentResult<Self> {
        config.validate()?;
        let wallet = Arc::new(config.open_wallet()?);
        let transport = Arc::new(TcpTransport::new(config.connection_config()));
        let context = Context::new(wallet.clone(), transport)
            .with_route(config.verity_pairwise_did.as_str());

        tracing::info!(
            "Client {} ready, agency at {}",
            config.sdk_pairwise_did,
            config.verity_addr()
        );

        Ok(Self {
            config,
            wallet,
            context,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Context to pass to protocol steps.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn wallet(&self) -> Arc<dyn Wallet> {
        self.wallet.clone()
    }

    /// Bind the inbound endpoint at the configured address.
    pub async fn endpoint(&self, handlers: Arc<Handlers>) -> AgentResult<Endpoint> {
        let endpoint = Endpoint::bind(self.config.endpoint_addr(), handlers, self.wallet()).await?;
        Ok(endpoint.with_max_message_size(self.config.max_message_size))
    }

    /// Close the wallet. Later packs and unpacks fail.
    pub fn close(&self) {
        self.wallet.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{sample_config, VERITY_SEED};
    use agentwire_core::protocols::issue_credential::{self, IssueCredential};
    use agentwire_core::protocols::question;
    use agentwire_core::{DispatchOutcome, InboundMessage, Transport as _};
    use ed25519_dalek::SigningKey;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Wallet on the agency side of the sample config's pairwise link.
    fn agency_wallet(config: &ClientConfig) -> LocalWallet {
        let sdk = agentwire_core::wallet::decode_verkey(&config.sdk_pairwise_verkey).unwrap();
        LocalWallet::new("agency", SigningKey::from_bytes(&VERITY_SEED), sdk)
    }

    #[tokio::test]
    async fn offer_reaches_agency_wrapped_in_forward() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = sample_config().with_verity_url(listener.local_addr().unwrap().to_string());
        let agency = agency_wallet(&config);
        let client = AgentClient::new(config).unwrap();

        let mut issuance = IssueCredential::new(
            "rel-1",
            "Degree",
            BTreeMap::from([("degree".to_string(), "Bachelors".to_string())]),
            "cred-def-1",
        );
        let thread_id = issuance.thread_id().to_string();
        let (sent, received) = tokio::join!(issuance.offer_credential(client.context()), async {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_frame(&mut stream, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap().unwrap()
        });
        sent.unwrap();

        let outer = agency.unpack(&received).unwrap();
        assert_eq!(outer["@fwd"], "did:verity:pairwise");
        let inner = agency
            .unpack(&serde_json::to_vec(&outer["@msg"]).unwrap())
            .unwrap();
        assert_eq!(
            inner["@type"].as_str().unwrap().rsplit('/').next(),
            Some(issue_credential::OFFER_CREDENTIAL)
        );
        assert_eq!(inner["~thread"]["thid"], thread_id.as_str());
    }

    #[tokio::test]
    async fn endpoint_dispatches_agency_messages() {
        let client = AgentClient::new(sample_config()).unwrap();
        let agency = agency_wallet(client.config());

        let (tx, mut rx) = mpsc::unbounded_channel::<(&'static str, InboundMessage)>();
        let answered = tx.clone();
        let mut builder = Handlers::builder();
        builder
            .add_status_handler(
                question::Question::status_type().to_string(),
                question::QUESTION_ANSWERED_STATUS,
                move |msg| {
                    let _ = answered.send(("answered", msg.clone()));
                    Ok(())
                },
            )
            .problem_report_handler(move |msg| {
                let _ = tx.send(("problem", msg.clone()));
                Ok(())
            });

        let endpoint = client.endpoint(Arc::new(builder.build())).await.unwrap();
        let addr = endpoint.local_addr().unwrap();
        tokio::spawn(endpoint.run());

        let transport = TcpTransport::new(ConnectionConfig::plaintext(addr.to_string()));
        let answer = json!({
            "@type": "vs.service/question/0.1/status",
            "@id": "m-1",
            "status": 1,
            "~thread": {"thid": "t-1"}
        });
        let problem = json!({
            "@type": "vs.service/question/0.1/problem-report",
            "@id": "m-2"
        });
        transport.send(&agency.pack(&answer).unwrap()).await.unwrap();
        transport.send(&agency.pack(&problem).unwrap()).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let (kind, msg) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push((kind, msg.id().unwrap().to_string()));
        }
        seen.sort();
        assert_eq!(
            seen,
            vec![("answered", "m-1".to_string()), ("problem", "m-2".to_string())]
        );

        let handlers = Handlers::builder().build();
        let outcome = handlers
            .handle_message(&InboundMessage::from_value(answer).unwrap())
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unhandled);
    }

    #[tokio::test]
    async fn closed_client_cannot_send() {
        let client = AgentClient::new(sample_config()).unwrap();
        client.close();

        let question = question::Question::new("conn-1", "t", "q", "d", ["a"]);
        let err = question.ask(client.context()).await.unwrap_err();
        assert_eq!(err.kind(), agentwire_core::ErrorKind::WalletFailure);
    }
}
