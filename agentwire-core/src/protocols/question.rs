//! Question/answer protocol.
//!
//! Asks a connection a question with a fixed set of valid responses. Each
//! response carries a nonce so the signed answer can be matched to exactly
//! one option.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::context::Context;
use crate::envelope::Envelope;
use crate::error::AgentResult;
use crate::instance::ProtocolInstance;
use crate::message_type::{MessageType, PROBLEM_REPORT};

use super::Protocol;

pub const DOMAIN: &str = "vs.service";
pub const FAMILY: &str = "question";
pub const VERSION: &str = "0.1";

pub const QUESTION: &str = "question";
pub const STATUS: &str = "status";

/// Status values carried by inbound `status` messages.
pub const QUESTION_SENT_STATUS: i64 = 0;
pub const QUESTION_ANSWERED_STATUS: i64 = 1;
pub const ERROR_STATUS: i64 = 2;

/// `vs.service/question/0.1/<kind>`.
pub fn message_type(kind: &str) -> MessageType {
    MessageType::new(DOMAIN, FAMILY, VERSION, kind)
}

/// One allowed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidResponse {
    pub text: String,
    pub nonce: String,
}

/// Question body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBody {
    pub notification_title: String,
    pub question_text: String,
    pub question_detail: String,
    pub valid_responses: Vec<ValidResponse>,
}

/// A question addressed to one connection.
#[derive(Debug)]
pub struct Question {
    protocol: Protocol,
    connection_id: String,
    body: QuestionBody,
}

impl Question {
    pub fn new<I, S>(
        connection_id: impl Into<String>,
        notification_title: impl Into<String>,
        question_text: impl Into<String>,
        question_detail: impl Into<String>,
        valid_responses: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let question_text = question_text.into();
        let valid_responses = valid_responses
            .into_iter()
            .map(|text| {
                let text = text.into();
                ValidResponse {
                    nonce: response_nonce(&question_text, &text),
                    text,
                }
            })
            .collect();

        Self {
            protocol: Protocol::new(DOMAIN, FAMILY, VERSION, ProtocolInstance::initiate()),
            connection_id: connection_id.into(),
            body: QuestionBody {
                notification_title: notification_title.into(),
                question_text,
                question_detail: question_detail.into(),
                valid_responses,
            },
        }
    }

    pub fn body(&self) -> &QuestionBody {
        &self.body
    }

    pub fn thread_id(&self) -> &str {
        self.protocol.thread_id()
    }

    /// Build the question message.
    pub fn ask_msg(&self) -> AgentResult<Envelope> {
        Ok(self
            .protocol
            .envelope(QUESTION)
            .with_field("connection_id", self.connection_id.as_str())
            .with_field("question", serde_json::to_value(&self.body)?))
    }

    pub fn ask_msg_packed(&self, ctx: &Context) -> AgentResult<Vec<u8>> {
        ctx.pack(&self.ask_msg()?)
    }

    /// Send the question.
    pub async fn ask(&self, ctx: &Context) -> AgentResult<()> {
        ctx.send(&self.ask_msg()?).await
    }

    /// Type of inbound status updates for questions.
    pub fn status_type() -> MessageType {
        message_type(STATUS)
    }

    /// Type of inbound problem reports for questions.
    pub fn problem_report_type() -> MessageType {
        message_type(PROBLEM_REPORT)
    }
}

/// hex(SHA-256(question || response || random uuid)).
fn response_nonce(question_text: &str, response: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question_text.as_bytes());
    hasher.update(response.as_bytes());
    hasher.update(Uuid::new_v4().to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::recording_context;
    use crate::wallet::Wallet as _;

    fn sample_question() -> Question {
        Question::new(
            "conn-1",
            "Challenge",
            "Hi Alice, are you on the phone with us?",
            "Asked at the start of the call",
            ["Yes, it's me", "No, that is not me!"],
        )
    }

    #[test]
    fn type_constants() {
        assert_eq!(message_type(QUESTION).to_string(), "vs.service/question/0.1/question");
        assert_eq!(
            Question::problem_report_type().to_string(),
            "vs.service/question/0.1/problem-report"
        );
        assert_eq!(Question::status_type().to_string(), "vs.service/question/0.1/status");
    }

    #[test]
    fn nonces_are_unique_hex() {
        let question = sample_question();
        let responses = &question.body().valid_responses;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].text, "Yes, it's me");
        assert_eq!(responses[0].nonce.len(), 64);
        assert!(responses[0].nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(responses[0].nonce, responses[1].nonce);
    }

    #[test]
    fn ask_message_shape() {
        let question = sample_question();
        let msg = question.ask_msg().unwrap();
        let value = msg.to_value().unwrap();

        assert_eq!(value["@type"], "vs.service/question/0.1/question");
        assert_eq!(value["connection_id"], "conn-1");
        assert_eq!(value["question"]["notification_title"], "Challenge");
        assert_eq!(value["question"]["valid_responses"][1]["text"], "No, that is not me!");
        assert_eq!(value["~thread"]["thid"], question.thread_id());
    }

    #[tokio::test]
    async fn ask_sends_packed() {
        let (ctx, transport, agency) = recording_context();
        let question = sample_question();
        question.ask(&ctx).await.unwrap();

        let msg = agency.unpack(&transport.sent()[0]).unwrap();
        assert_eq!(msg["question"]["question_text"], question.body().question_text.as_str());
    }
}
