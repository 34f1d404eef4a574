//! Protocol instances (threads).

use std::sync::OnceLock;

use crate::envelope::new_message_id;

/// One logical, possibly multi-step interaction, identified by its thread id.
///
/// The thread id is bound at most once. Once bound it never changes, so
/// steps sharing an instance only ever read it.
#[derive(Debug)]
pub struct ProtocolInstance {
    thread_id: OnceLock<String>,
    started: bool,
}

impl ProtocolInstance {
    /// Start a new interaction. The thread id is generated on first use.
    pub fn initiate() -> Self {
        Self {
            thread_id: OnceLock::new(),
            started: true,
        }
    }

    /// Start a new interaction under a caller-chosen thread id.
    pub fn with_thread_id(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: OnceLock::from(thread_id.into()),
            started: true,
        }
    }

    /// Respond within an interaction the counterparty started.
    pub fn join(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: OnceLock::from(thread_id.into()),
            started: false,
        }
    }

    /// Whether this party started the interaction.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Thread id, binding a fresh one if none is bound yet.
    pub fn thread_id(&self) -> &str {
        self.thread_id.get_or_init(new_message_id)
    }

    /// Thread id if already bound.
    pub fn bound_thread_id(&self) -> Option<&str> {
        self.thread_id.get().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn initiator_binds_lazily_once() {
        let instance = ProtocolInstance::initiate();
        assert!(instance.started());
        assert!(instance.bound_thread_id().is_none());

        let first = instance.thread_id().to_string();
        assert_eq!(instance.thread_id(), first);
        assert_eq!(instance.bound_thread_id(), Some(first.as_str()));
    }

    #[test]
    fn joined_keeps_supplied_thread() {
        let instance = ProtocolInstance::join("thread-42");
        assert!(!instance.started());
        assert_eq!(instance.thread_id(), "thread-42");

        let own = ProtocolInstance::with_thread_id("mine");
        assert!(own.started());
        assert_eq!(own.thread_id(), "mine");
    }

    #[test]
    fn concurrent_binding_agrees() {
        let instance = Arc::new(ProtocolInstance::initiate());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let instance = Arc::clone(&instance);
                std::thread::spawn(move || instance.thread_id().to_string())
            })
            .collect();

        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| id == &ids[0]));
    }
}
