//! Error types for agentwire.

use thiserror::Error;

/// Stable, serializable classification of an [`AgentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Packing or unpacking failed in the wallet.
    WalletFailure,
    /// The transport could not deliver a message.
    IoFailure,
    /// Message type string or message document is malformed.
    InvalidMessageFormat,
    /// A role or state precondition was violated.
    IllegalOperation,
    /// The operation is intentionally unimplemented for this role.
    NotSupported,
    /// Configuration is missing or invalid.
    Config,
    /// JSON (de)serialization failed.
    Serialization,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WalletFailure => write!(f, "wallet_failure"),
            Self::IoFailure => write!(f, "io_failure"),
            Self::InvalidMessageFormat => write!(f, "invalid_message_format"),
            Self::IllegalOperation => write!(f, "illegal_operation"),
            Self::NotSupported => write!(f, "not_supported"),
            Self::Config => write!(f, "config"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// agentwire errors.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Encryption, decryption, signing or verification failed.
    #[error("wallet error: {0}")]
    Wallet(String),

    /// Transport send failed.
    #[error("io error: {0}")]
    Io(String),

    /// Malformed `@type` or message structure.
    #[error("invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Role/state precondition violated.
    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    /// Operation not supported for the current role.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Invalid or incomplete configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Wallet(_) => ErrorKind::WalletFailure,
            Self::Io(_) => ErrorKind::IoFailure,
            Self::InvalidMessageFormat(_) => ErrorKind::InvalidMessageFormat,
            Self::IllegalOperation(_) => ErrorKind::IllegalOperation,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::Config(_) => ErrorKind::Config,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

/// Result type alias for agentwire operations.
pub type AgentResult<T> = Result<T, AgentError>;
