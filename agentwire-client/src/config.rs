//! Client configuration.
//!
//! Deserialized from the JSON document written at provisioning time:
//!
//! ```json
//! {
//!   "walletName": "...", "walletSeed": "<base64 32 bytes>",
//!   "verityUrl": "agency.example.com:3000",
//!   "verityPublicDID": "...", "verityPublicVerkey": "...",
//!   "verityPairwiseDID": "...", "verityPairwiseVerkey": "...",
//!   "sdkPairwiseDID": "...", "sdkPairwiseVerkey": "...",
//!   "endpointUrl": "0.0.0.0:4000"
//! }
//! ```

use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use agentwire_core::wallet::decode_verkey;
use agentwire_core::{AgentError, AgentResult, LocalWallet};

use crate::connection::{ConnectionConfig, DEFAULT_MAX_MESSAGE_SIZE};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub wallet_name: String,
    /// Base64 Ed25519 seed of the SDK's pairwise key.
    pub wallet_seed: String,
    /// Agency address, optionally prefixed with a scheme.
    pub verity_url: String,
    #[serde(rename = "verityPublicDID")]
    pub verity_public_did: String,
    pub verity_public_verkey: String,
    #[serde(rename = "verityPairwiseDID")]
    pub verity_pairwise_did: String,
    pub verity_pairwise_verkey: String,
    #[serde(rename = "sdkPairwiseDID")]
    pub sdk_pairwise_did: String,
    pub sdk_pairwise_verkey: String,
    /// Address the inbound endpoint listens on.
    pub endpoint_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_window_ms: Option<i64>,
}

/// TLS settings for the agency connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

impl ClientConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> AgentResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AgentError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> AgentResult<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AgentError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Serialize back to JSON.
    pub fn to_json(&self) -> AgentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the agency address.
    pub fn with_verity_url(mut self, url: impl Into<String>) -> Self {
        self.verity_url = url.into();
        self
    }

    /// Set the inbound endpoint address.
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    /// Enable TLS towards the agency.
    pub fn with_tls(mut self, server_name: Option<String>, ca_cert_path: Option<PathBuf>) -> Self {
        self.tls = Some(TlsConfig {
            server_name,
            ca_cert_path,
        });
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn with_replay_window(mut self, window_ms: i64) -> Self {
        self.replay_window_ms = Some(window_ms);
        self
    }

    /// Check required fields and key material.
    pub fn validate(&self) -> AgentResult<()> {
        let required = [
            ("walletName", &self.wallet_name),
            ("verityPublicDID", &self.verity_public_did),
            ("verityPairwiseDID", &self.verity_pairwise_did),
            ("sdkPairwiseDID", &self.sdk_pairwise_did),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AgentError::Config(format!("{} is required", field)));
            }
        }

        for (field, value) in [
            ("verityPublicVerkey", &self.verity_public_verkey),
            ("verityPairwiseVerkey", &self.verity_pairwise_verkey),
            ("sdkPairwiseVerkey", &self.sdk_pairwise_verkey),
        ] {
            decode_verkey(value)
                .map_err(|e| AgentError::Config(format!("{}: {}", field, e)))?;
        }
        self.seed()?;

        validate_addr("verityUrl", self.verity_addr())?;
        validate_addr("endpointUrl", strip_scheme(&self.endpoint_url))?;

        if self.max_message_size == 0 {
            return Err(AgentError::Config(
                "maxMessageSize must be greater than 0".to_string(),
            ));
        }
        if matches!(self.replay_window_ms, Some(ms) if ms <= 0) {
            return Err(AgentError::Config(
                "replayWindowMs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Agency `host:port` with any scheme and trailing slash removed.
    pub fn verity_addr(&self) -> &str {
        strip_scheme(&self.verity_url)
    }

    /// Endpoint `host:port` with any scheme and trailing slash removed.
    pub fn endpoint_addr(&self) -> &str {
        strip_scheme(&self.endpoint_url)
    }

    /// Open the SDK wallet described by this configuration.
    ///
    /// The seed must derive `sdkPairwiseVerkey`.
    pub fn open_wallet(&self) -> AgentResult<LocalWallet> {
        let peer = decode_verkey(&self.verity_pairwise_verkey)
            .map_err(|e| AgentError::Config(format!("verityPairwiseVerkey: {}", e)))?;
        let mut wallet = LocalWallet::from_seed(self.wallet_name.as_str(), &self.seed()?, peer);
        if wallet.verkey() != self.sdk_pairwise_verkey {
            return Err(AgentError::Config(
                "walletSeed does not match sdkPairwiseVerkey".to_string(),
            ));
        }
        if let Some(window_ms) = self.replay_window_ms {
            wallet = wallet.with_replay_window(window_ms);
        }
        Ok(wallet)
    }

    /// Transport settings for the agency connection.
    pub fn connection_config(&self) -> ConnectionConfig {
        let base = match &self.tls {
            Some(tls) => {
                let mut config = ConnectionConfig::plaintext(self.verity_addr());
                config.use_tls = true;
                config.server_name = tls.server_name.clone();
                config.ca_cert_path = tls.ca_cert_path.clone();
                config
            }
            None => ConnectionConfig::plaintext(self.verity_addr()),
        };
        base.with_max_message_size(self.max_message_size)
    }

    fn seed(&self) -> AgentResult<[u8; 32]> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.wallet_seed)
            .map_err(|e| AgentError::Config(format!("walletSeed: invalid base64: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| AgentError::Config("walletSeed must be 32 bytes".to_string()))
    }
}

fn strip_scheme(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme.trim_end_matches('/')
}

fn validate_addr(field: &str, addr: &str) -> AgentResult<()> {
    let valid = addr
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(AgentError::Config(format!(
            "{} must be host:port, got {:?}",
            field, addr
        )))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use agentwire_core::wallet::encode_verkey;
    use ed25519_dalek::SigningKey;

    pub(crate) const SDK_SEED: [u8; 32] = [7u8; 32];
    pub(crate) const VERITY_SEED: [u8; 32] = [9u8; 32];

    pub(crate) fn sample_config() -> ClientConfig {
        let b64 = base64::engine::general_purpose::STANDARD;
        let sdk = SigningKey::from_bytes(&SDK_SEED).verifying_key();
        let verity = SigningKey::from_bytes(&VERITY_SEED).verifying_key();

        ClientConfig::from_json(
            &serde_json::json!({
                "walletName": "test-wallet",
                "walletSeed": b64.encode(SDK_SEED),
                "verityUrl": "http://localhost:3000/",
                "verityPublicDID": "did:verity:public",
                "verityPublicVerkey": encode_verkey(&verity),
                "verityPairwiseDID": "did:verity:pairwise",
                "verityPairwiseVerkey": encode_verkey(&verity),
                "sdkPairwiseDID": "did:sdk:pairwise",
                "sdkPairwiseVerkey": encode_verkey(&sdk),
                "endpointUrl": "127.0.0.1:0"
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn parses_provisioned_json() {
        let config = sample_config();
        assert_eq!(config.wallet_name, "test-wallet");
        assert_eq!(config.verity_addr(), "localhost:3000");
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert!(config.tls.is_none());

        let json = config.to_json().unwrap();
        assert!(json.contains("\"verityPairwiseDID\""));
        assert_eq!(ClientConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = sample_config();
        config.sdk_pairwise_did = " ".to_string();
        assert!(config.validate().is_err());

        let config = sample_config().with_verity_url("no-port");
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), agentwire_core::ErrorKind::Config);

        assert!(sample_config().with_max_message_size(0).validate().is_err());
        assert!(sample_config().with_replay_window(0).validate().is_err());

        let mut config = sample_config();
        config.verity_pairwise_verkey = "AAAA".to_string();
        assert!(config.validate().is_err());

        assert!(ClientConfig::from_json("{}").is_err());
    }

    #[test]
    fn opens_matching_wallet() {
        let config = sample_config();
        let wallet = config.open_wallet().unwrap();
        assert_eq!(wallet.name(), "test-wallet");
        assert_eq!(wallet.verkey(), config.sdk_pairwise_verkey);
        assert_eq!(wallet.peer_verkey(), config.verity_pairwise_verkey);

        let mut mismatched = sample_config();
        mismatched.sdk_pairwise_verkey = mismatched.verity_pairwise_verkey.clone();
        assert!(mismatched.open_wallet().is_err());
    }

    #[test]
    fn tls_connection_config() {
        let config = sample_config()
            .with_tls(Some("agency.example.com".to_string()), None)
            .with_max_message_size(2048);
        let conn = config.connection_config();
        assert!(conn.use_tls);
        assert_eq!(conn.server_addr, "localhost:3000");
        assert_eq!(conn.server_name.as_deref(), Some("agency.example.com"));
        assert_eq!(conn.max_message_size, 2048);
    }

    #[test]
    fn reads_from_file() {
        let path = std::env::temp_dir().join(format!("agentwire-config-{}.json", std::process::id()));
        std::fs::write(&path, sample_config().to_json().unwrap()).unwrap();
        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config, sample_config());
        std::fs::remove_file(&path).unwrap();

        assert!(ClientConfig::from_file("/nonexistent/agentwire.json").is_err());
    }
}
