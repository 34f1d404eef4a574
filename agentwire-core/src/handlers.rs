//! Inbound message handlers and dispatch.
//!
//! Handlers are registered on a [`HandlersBuilder`] and frozen into an
//! immutable [`Handlers`] before any message is dispatched. A frozen
//! registry can be shared (`Arc<Handlers>`) and dispatched from several
//! threads at once.
//!
//! Dispatch fans out to every matching entry in registration order. Only
//! when nothing matched does it fall back, to the problem-report handler
//! for `.../problem-report` messages and to the default handler otherwise.

use crate::error::AgentResult;
use crate::inbound::InboundMessage;
use crate::message_type::is_problem_report;
use crate::wallet::Wallet;

/// Handler callback.
pub type MessageHandler = Box<dyn Fn(&InboundMessage) -> AgentResult<()> + Send + Sync>;

struct HandlerEntry {
    message_type: String,
    status: Option<i64>,
    handler: MessageHandler,
}

impl HandlerEntry {
    fn handles(&self, message_type: &str, status: Option<i64>) -> bool {
        self.message_type == message_type
            && match self.status {
                None => true,
                Some(expected) => status == Some(expected),
            }
    }
}

/// What happened to a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// This many registered handlers matched and ran.
    Handled(usize),
    /// Nothing matched; the problem-report handler ran.
    ProblemReport,
    /// Nothing matched; the default handler ran.
    Default,
    /// Nothing matched and no fallback applied. The message was dropped.
    Unhandled,
}

/// Mutable registration phase.
#[derive(Default)]
pub struct HandlersBuilder {
    entries: Vec<HandlerEntry>,
    problem_report: Option<MessageHandler>,
    default: Option<MessageHandler>,
}

impl HandlersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle every message of `message_type`, whatever its status.
    pub fn add_handler<F>(&mut self, message_type: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&InboundMessage) -> AgentResult<()> + Send + Sync + 'static,
    {
        self.push(message_type.into(), None, Box::new(handler))
    }

    /// Handle messages of `message_type` whose `status` equals `status`.
    pub fn add_status_handler<F>(
        &mut self,
        message_type: impl Into<String>,
        status: i64,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&InboundMessage) -> AgentResult<()> + Send + Sync + 'static,
    {
        self.push(message_type.into(), Some(status), Box::new(handler))
    }

    /// Handler for problem reports nothing else handled. Replaces any previous one.
    pub fn problem_report_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&InboundMessage) -> AgentResult<()> + Send + Sync + 'static,
    {
        self.problem_report = Some(Box::new(handler));
        self
    }

    /// Handler for any other message nothing else handled. Replaces any previous one.
    pub fn default_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&InboundMessage) -> AgentResult<()> + Send + Sync + 'static,
    {
        self.default = Some(Box::new(handler));
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> Handlers {
        Handlers {
            entries: self.entries,
            problem_report: self.problem_report,
            default: self.default,
        }
    }

    fn push(
        &mut self,
        message_type: String,
        status: Option<i64>,
        handler: MessageHandler,
    ) -> &mut Self {
        self.entries.push(HandlerEntry {
            message_type,
            status,
            handler,
        });
        self
    }
}

/// Frozen handler registry.
pub struct Handlers {
    entries: Vec<HandlerEntry>,
    problem_report: Option<MessageHandler>,
    default: Option<MessageHandler>,
}

impl Handlers {
    pub fn builder() -> HandlersBuilder {
        HandlersBuilder::new()
    }

    /// Number of registered (non-fallback) handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unpack `packed` with `wallet` and dispatch the result.
    ///
    /// Unpack failures abort before any handler runs.
    pub fn dispatch(&self, wallet: &dyn Wallet, packed: &[u8]) -> AgentResult<DispatchOutcome> {
        let message = InboundMessage::from_value(wallet.unpack(packed)?)?;
        self.handle_message(&message)
    }

    /// Dispatch an already unpacked message.
    ///
    /// The first handler error stops dispatch and is returned as is.
    pub fn handle_message(&self, message: &InboundMessage) -> AgentResult<DispatchOutcome> {
        let message_type = message.message_type()?;
        let status = message.status();

        let mut handled = 0;
        for entry in self.entries.iter().filter(|e| e.handles(message_type, status)) {
            (entry.handler)(message)?;
            handled += 1;
        }
        if handled > 0 {
            tracing::debug!("{} handler(s) ran for {}", handled, message_type);
            return Ok(DispatchOutcome::Handled(handled));
        }

        if is_problem_report(message_type)? {
            if let Some(handler) = &self.problem_report {
                tracing::debug!("Problem report {} sent to fallback handler", message_type);
                handler(message)?;
                return Ok(DispatchOutcome::ProblemReport);
            }
        }
        if let Some(handler) = &self.default {
            tracing::debug!("No handler for {}, using default handler", message_type);
            handler(message)?;
            return Ok(DispatchOutcome::Default);
        }

        tracing::debug!("Dropping unhandled message {}", message_type);
        Ok(DispatchOutcome::Unhandled)
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("entries", &self.entries.len())
            .field("problem_report", &self.problem_report.is_some())
            .field("default", &self.default.is_some())
            .finish()
    }
}
