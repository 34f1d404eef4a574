//! Wallet boundary: packing and unpacking of wire messages.
//!
//! [`LocalWallet`] is an in-process implementation that signs the
//! canonical JSON of a message with Ed25519:
//!
//! ```text
//! { "protected": b64({alg, kid, created}),
//!   "payload":   b64(JCS(message)),
//!   "signature": b64(Ed25519(protected "." payload)) }
//! ```
//!
//! Messages are authenticated, not encrypted.

use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, AgentResult};

const ALG: &str = "EdDSA";

/// Packs outbound and unpacks inbound wire messages.
pub trait Wallet: Send + Sync {
    /// Turn a plaintext message into wire bytes.
    fn pack(&self, message: &Value) -> AgentResult<Vec<u8>>;

    /// Turn wire bytes back into the plaintext message.
    fn unpack(&self, packed: &[u8]) -> AgentResult<Value>;
}

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    kid: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackedMessage {
    protected: String,
    payload: String,
    signature: String,
}

/// Ed25519 signing wallet holding our key and the peer's verkey.
pub struct LocalWallet {
    name: String,
    signing_key: SigningKey,
    peer: VerifyingKey,
    replay_window: Option<Duration>,
    closed: AtomicBool,
}

impl LocalWallet {
    /// Open a wallet from our signing key and the peer's verifying key.
    pub fn new(name: impl Into<String>, signing_key: SigningKey, peer: VerifyingKey) -> Self {
        Self {
            name: name.into(),
            signing_key,
            peer,
            replay_window: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Open a wallet from a 32-byte seed.
    pub fn from_seed(name: impl Into<String>, seed: &[u8; 32], peer: VerifyingKey) -> Self {
        Self::new(name, SigningKey::from_bytes(seed), peer)
    }

    /// Reject inbound messages created more than `window_ms` from now.
    pub fn with_replay_window(mut self, window_ms: i64) -> Self {
        self.replay_window = Some(Duration::milliseconds(window_ms));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Our verkey, base64 encoded.
    pub fn verkey(&self) -> String {
        encode_verkey(&self.signing_key.verifying_key())
    }

    /// The peer's verkey, base64 encoded.
    pub fn peer_verkey(&self) -> String {
        encode_verkey(&self.peer)
    }

    /// Close the wallet. Every later operation fails.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("Wallet {} closed", self.name);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sign `payload` under a fresh protected header.
    fn seal(&self, payload: &[u8]) -> AgentResult<Vec<u8>> {
        let b64 = base64::engine::general_purpose::STANDARD;

        let header = ProtectedHeader {
            alg: ALG.to_string(),
            kid: self.verkey(),
            created: Utc::now(),
        };
        let protected = b64.encode(serde_json::to_vec(&header)?);
        let payload = b64.encode(payload);

        let signature: Signature = self
            .signing_key
            .sign(signing_input(&protected, &payload).as_bytes());

        let packed = PackedMessage {
            protected,
            payload,
            signature: b64.encode(signature.to_bytes()),
        };
        Ok(serde_json::to_vec(&packed)?)
    }

    fn ensure_open(&self) -> AgentResult<()> {
        if self.is_closed() {
            return Err(AgentError::Wallet("wallet is closed".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("name", &self.name)
            .field("verkey", &self.verkey())
            .field("peer", &self.peer_verkey())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Wallet for LocalWallet {
    fn pack(&self, message: &Value) -> AgentResult<Vec<u8>> {
        self.ensure_open()?;
        self.seal(canonicalize_json(message).as_bytes())
    }

    fn unpack(&self, packed: &[u8]) -> AgentResult<Value> {
        self.ensure_open()?;
        let b64 = base64::engine::general_purpose::STANDARD;

        let packed: PackedMessage = serde_json::from_slice(packed)
            .map_err(|e| AgentError::Wallet(format!("malformed packed message: {}", e)))?;

        let header_bytes = b64
            .decode(&packed.protected)
            .map_err(|e| AgentError::Wallet(format!("invalid protected header: {}", e)))?;
        let header: ProtectedHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| AgentError::Wallet(format!("invalid protected header: {}", e)))?;

        if header.alg != ALG {
            return Err(AgentError::Wallet(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }
        if header.kid != self.peer_verkey() {
            return Err(AgentError::Wallet(format!(
                "message signed by unknown key {}",
                header.kid
            )));
        }

        let signature_bytes = b64
            .decode(&packed.signature)
            .map_err(|e| AgentError::Wallet(format!("invalid base64: {}", e)))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|e| AgentError::Wallet(format!("invalid signature format: {}", e)))?;

        self.peer
            .verify(
                signing_input(&packed.protected, &packed.payload).as_bytes(),
                &signature,
            )
            .map_err(|_| AgentError::Wallet("signature verification failed".to_string()))?;

        if let Some(window) = self.replay_window {
            check_replay(header.created, window)?;
        }

        let payload = b64
            .decode(&packed.payload)
            .map_err(|e| AgentError::Wallet(format!("invalid payload: {}", e)))?;
        serde_json::from_slice(&payload)
            .map_err(|e| AgentError::Wallet(format!("invalid payload: {}", e)))
    }
}

fn signing_input(protected: &str, payload: &str) -> String {
    format!("{}.{}", protected, payload)
}

/// Reject messages whose creation time is outside `window` of now.
fn check_replay(created: DateTime<Utc>, window: Duration) -> AgentResult<()> {
    let diff = Utc::now().signed_duration_since(created);
    if diff.abs() > window {
        return Err(AgentError::Wallet(format!(
            "message created at {} is outside the replay window",
            created.to_rfc3339()
        )));
    }
    Ok(())
}

/// Base64 form of a verifying key.
pub fn encode_verkey(key: &VerifyingKey) -> String {
    base64::engine::general_purpose::STANDARD.encode(key.as_bytes())
}

/// Parse a base64 verkey.
pub fn decode_verkey(verkey: &str) -> AgentResult<VerifyingKey> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(verkey)
        .map_err(|e| AgentError::Wallet(format!("invalid verkey encoding: {}", e)))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AgentError::Wallet("verkey must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| AgentError::Wallet(format!("invalid verkey: {}", e)))
}

/// JCS (RFC 8785) JSON canonicalization: sorted keys, no whitespace.
pub fn canonicalize_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(arr) => {
            let elements: Vec<String> = arr.iter().map(canonicalize_json).collect();
            format!("[{}]", elements.join(","))
        }
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            let pairs: Vec<String> = keys
                .iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        Value::String((*k).clone()),
                        canonicalize_json(&obj[k.as_str()])
                    )
                })
                .collect();
            format!("{{{}}}", pairs.join(","))
        }
    }
}
