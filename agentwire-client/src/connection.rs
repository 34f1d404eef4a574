//! TCP/TLS transport to the agency.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use agentwire_core::{AgentError, AgentResult, Transport};

use crate::frame::write_frame;

/// Default max message size (1MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Transport connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Agency address, `host:port`.
    pub server_addr: String,
    /// Server hostname for TLS (defaults to the host part of the address).
    pub server_name: Option<String>,
    /// Whether to use TLS.
    pub use_tls: bool,
    /// PEM file with CA certificates to trust.
    pub ca_cert_path: Option<PathBuf>,
    /// Max message size.
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3000".to_string(),
            server_name: None,
            use_tls: false,
            ca_cert_path: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ConnectionConfig {
    /// Create config for plaintext connection.
    pub fn plaintext(addr: impl Into<String>) -> Self {
        Self {
            server_addr: addr.into(),
            use_tls: false,
            ..Default::default()
        }
    }

    /// Create config for TLS connection.
    pub fn tls(addr: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            server_addr: addr.into(),
            server_name: Some(server_name.into()),
            use_tls: true,
            ..Default::default()
        }
    }

    /// Trust the CA certificates in a PEM file.
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    fn host(&self) -> &str {
        self.server_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&self.server_addr)
    }
}

/// An open connection to the agency.
pub enum Connection {
    Tcp(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl Connection {
    /// Connect to the agency.
    pub async fn connect(config: &ConnectionConfig) -> AgentResult<Self> {
        let stream = TcpStream::connect(config.server_addr.as_str())
            .await
            .map_err(|e| AgentError::Io(format!("Connection failed: {}", e)))?;

        if !config.use_tls {
            return Ok(Self::Tcp(stream));
        }

        let connector = Self::create_tls_connector(config)?;
        let server_name_str = config
            .server_name
            .clone()
            .unwrap_or_else(|| config.host().to_string());
        let server_name: ServerName<'static> = server_name_str
            .try_into()
            .map_err(|_| AgentError::Io("Invalid server name".to_string()))?;

        let tls_stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| AgentError::Io(format!("TLS handshake failed: {}", e)))?;

        Ok(Self::Tls(Box::new(tls_stream)))
    }

    /// Create TLS connector trusting the configured CA file.
    fn create_tls_connector(config: &ConnectionConfig) -> AgentResult<TlsConnector> {
        let mut root_store = rustls::RootCertStore::empty();

        match &config.ca_cert_path {
            Some(path) => {
                let file = File::open(path)
                    .map_err(|e| AgentError::Io(format!("Failed to open CA cert: {}", e)))?;
                for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
                    let cert =
                        cert.map_err(|e| AgentError::Io(format!("Invalid CA cert: {}", e)))?;
                    root_store
                        .add(cert)
                        .map_err(|e| AgentError::Io(format!("Invalid CA cert: {}", e)))?;
                }
            }
            None => tracing::warn!("TLS enabled without a CA certificate; handshakes will fail"),
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(TlsConnector::from(Arc::new(tls_config)))
    }

    /// Send one packed message.
    pub async fn send_packed(&mut self, packed: &[u8], max_size: usize) -> AgentResult<()> {
        match self {
            Self::Tcp(stream) => write_frame(stream, packed, max_size).await,
            Self::Tls(stream) => write_frame(stream.as_mut(), packed, max_size).await,
        }
    }
}

/// [`Transport`] that opens a connection per message.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: ConnectionConfig,
}

impl TcpTransport {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, packed: &[u8]) -> AgentResult<()> {
        if packed.len() > self.config.max_message_size {
            return Err(AgentError::Io(format!(
                "Message too large: {} > {}",
                packed.len(),
                self.config.max_message_size
            )));
        }

        let mut connection = Connection::connect(&self.config).await?;
        connection
            .send_packed(packed, self.config.max_message_size)
            .await?;
        tracing::debug!("Sent {} bytes to {}", packed.len(), self.config.server_addr);
        Ok(())
    }
}
