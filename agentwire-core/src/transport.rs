//! Transport boundary.

use async_trait::async_trait;

use crate::error::AgentResult;

/// Delivers packed bytes to the remote agency.
///
/// Failures surface as [`AgentError::Io`](crate::AgentError::Io); retries
/// and timeouts are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, packed: &[u8]) -> AgentResult<()>;
}
