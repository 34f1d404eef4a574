//! # agentwire-core
//!
//! Core library for agentwire, a client for asynchronous, message-oriented
//! agent protocols.
//!
//! This crate provides message type identifiers, the envelope builder and
//! thread correlation, the inbound handler registry and dispatcher, the
//! wallet and transport boundaries, and the protocol families built on
//! them (issue-credential, question, connecting).

pub mod context;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod inbound;
pub mod instance;
pub mod message_type;
pub mod protocols;
pub mod state;
pub mod transport;
pub mod wallet;

pub use context::Context;
pub use envelope::{forward, new_message_id, Envelope, Thread};
pub use error::{AgentError, AgentResult, ErrorKind};
pub use handlers::{DispatchOutcome, Handlers, HandlersBuilder, MessageHandler};
pub use inbound::InboundMessage;
pub use instance::ProtocolInstance;
pub use message_type::{MessageType, EVERNYM_MSG_QUALIFIER, PROBLEM_REPORT};
pub use protocols::{Connecting, IssueCredential, Question};
pub use state::{IssuanceEvent, IssuanceState};
pub use transport::Transport;
pub use wallet::{LocalWallet, Wallet};
