//! Message type identifiers.
//!
//! Every protocol message carries an `@type` of the form
//! `<domain>/<family>/<version>/<kind>`. The fourth segment (the kind) is
//! what classifies problem reports regardless of protocol family.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AgentError, AgentResult};

/// Message kind shared by every family for protocol-level errors.
pub const PROBLEM_REPORT: &str = "problem-report";

/// DID qualifier used by the agency's own protocol families.
pub const EVERNYM_MSG_QUALIFIER: &str = "did:sov:123456789abcdefghi1234";

/// Build the `<qualifier>;spec` domain segment.
pub fn spec_domain(qualifier: &str) -> String {
    format!("{};spec", qualifier)
}

/// Structured `@type` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageType {
    pub domain: String,
    pub family: String,
    pub version: String,
    pub kind: String,
}

impl MessageType {
    /// Create a message type from its four segments.
    pub fn new(
        domain: impl Into<String>,
        family: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            family: family.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Same family and version, different kind.
    pub fn with_kind(&self, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..self.clone()
        }
    }

    /// Whether this is a problem report of any family.
    pub fn is_problem_report(&self) -> bool {
        self.kind == PROBLEM_REPORT
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.domain, self.family, self.version, self.kind
        )
    }
}

impl FromStr for MessageType {
    type Err = AgentError;

    fn from_str(s: &str) -> AgentResult<Self> {
        let segments: Vec<&str> = s.split('/').collect();
        if segments.len() != 4 || segments.iter().any(|seg| seg.is_empty()) {
            return Err(AgentError::InvalidMessageFormat(format!(
                "expected <domain>/<family>/<version>/<kind>, got {:?}",
                s
            )));
        }
        Ok(Self::new(segments[0], segments[1], segments[2], segments[3]))
    }
}

impl TryFrom<&str> for MessageType {
    type Error = AgentError;

    fn try_from(s: &str) -> AgentResult<Self> {
        s.parse()
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Extract the kind (4th segment) of a raw `@type` string.
///
/// Lenient counterpart of [`MessageType::from_str`]: trailing segments are
/// tolerated, fewer than four are not.
pub fn message_kind(raw: &str) -> AgentResult<&str> {
    raw.split('/').nth(3).ok_or_else(|| {
        AgentError::InvalidMessageFormat(format!(
            "message type {:?} has fewer than 4 segments",
            raw
        ))
    })
}

/// Whether a raw `@type` string names a problem report.
pub fn is_problem_report(raw: &str) -> AgentResult<bool> {
    Ok(message_kind(raw)? == PROBLEM_REPORT)
}
