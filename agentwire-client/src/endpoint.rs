//! Inbound endpoint: accepts framed messages from the agency and
//! dispatches them to the registered handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};

use agentwire_core::{AgentError, AgentResult, Handlers, Wallet};

use crate::connection::DEFAULT_MAX_MESSAGE_SIZE;
use crate::frame::read_frame;

/// Listener feeding inbound messages to [`Handlers`].
pub struct Endpoint {
    listener: TcpListener,
    handlers: Arc<Handlers>,
    wallet: Arc<dyn Wallet>,
    max_message_size: usize,
}

impl Endpoint {
    /// Bind the endpoint.
    pub async fn bind(
        addr: &str,
        handlers: Arc<Handlers>,
        wallet: Arc<dyn Wallet>,
    ) -> AgentResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AgentError::Io(format!("Failed to bind {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            handlers,
            wallet,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn local_addr(&self) -> AgentResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| AgentError::Io(format!("No local address: {}", e)))
    }

    /// Accept connections until the accept loop fails.
    pub async fn run(self) -> AgentResult<()> {
        tracing::info!("Endpoint listening on {}", self.local_addr()?);

        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .map_err(|e| AgentError::Io(format!("Accept failed: {}", e)))?;

            tracing::debug!("Connection from {}", addr);

            let handlers = Arc::clone(&self.handlers);
            let wallet = Arc::clone(&self.wallet);
            let max_message_size = self.max_message_size;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, handlers, wallet, max_message_size).await {
                    tracing::error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    handlers: Arc<Handlers>,
    wallet: Arc<dyn Wallet>,
    max_message_size: usize,
) -> AgentResult<usize> {
    handle_stream(stream, &handlers, wallet.as_ref(), max_message_size).await
}

/// Dispatch every frame on `stream` until it closes.
///
/// A message that fails to unpack or whose handler fails is logged and
/// skipped; framing errors end the stream. Returns the number of frames read.
pub async fn handle_stream<S>(
    mut stream: S,
    handlers: &Handlers,
    wallet: &dyn Wallet,
    max_message_size: usize,
) -> AgentResult<usize>
where
    S: AsyncRead + Unpin,
{
    let mut frames = 0;
    while let Some(packed) = read_frame(&mut stream, max_message_size).await? {
        frames += 1;
        match handlers.dispatch(wallet, &packed) {
            Ok(outcome) => tracing::debug!("Dispatched inbound message: {:?}", outcome),
            Err(e) => tracing::warn!("Failed to handle inbound message ({}): {}", e.kind(), e),
        }
    }
    tracing::debug!("Peer disconnected after {} message(s)", frames);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::write_frame;
    use agentwire_core::{AgentError, LocalWallet};
    use ed25519_dalek::SigningKey;
    use serde_json::json;
    use std::sync::Mutex;

    fn wallet_pair() -> (Arc<LocalWallet>, Arc<LocalWallet>) {
        let sdk_key = SigningKey::from_bytes(&[1u8; 32]);
        let agency_key = SigningKey::from_bytes(&[2u8; 32]);
        let sdk = LocalWallet::new("sdk", sdk_key.clone(), agency_key.verifying_key());
        let agency = LocalWallet::new("agency", agency_key, sdk_key.verifying_key());
        (Arc::new(sdk), Arc::new(agency))
    }

    #[tokio::test]
    async fn bad_messages_do_not_stop_the_stream() {
        let (sdk, agency) = wallet_pair();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut builder = Handlers::builder();
        let log = Arc::clone(&seen);
        builder
            .add_handler("a/b/0.1/x", move |msg| {
                log.lock().unwrap().push(msg.id().unwrap_or_default().to_string());
                Ok(())
            })
            .add_handler("a/b/0.1/fail", |_msg| {
                Err(AgentError::IllegalOperation("handler failed".to_string()))
            });
        let handlers = builder.build();

        let (mut tx, rx) = tokio::io::duplex(64 * 1024);
        let frames = [
            agency.pack(&json!({"@type": "a/b/0.1/x", "@id": "1"})).unwrap(),
            b"not packed".to_vec(),
            agency.pack(&json!({"@type": "a/b/0.1/fail"})).unwrap(),
            agency.pack(&json!({"@type": "a/b/0.1/x", "@id": "2"})).unwrap(),
        ];
        for frame in &frames {
            write_frame(&mut tx, frame, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap();
        }
        drop(tx);

        let count = handle_stream(rx, &handlers, sdk.as_ref(), DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        assert_eq!(count, 4);
        assert_eq!(*seen.lock().unwrap(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn oversized_frame_ends_stream() {
        let (sdk, _agency) = wallet_pair();
        let handlers = Handlers::builder().build();

        let (mut tx, rx) = tokio::io::duplex(1024);
        write_frame(&mut tx, &[0u8; 100], 1024).await.unwrap();
        drop(tx);

        let err = handle_stream(rx, &handlers, sdk.as_ref(), 10).await.unwrap_err();
        assert_eq!(err.kind(), agentwire_core::ErrorKind::IoFailure);
    }
}
