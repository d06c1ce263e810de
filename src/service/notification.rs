//! Notification envelope and payloads emitted to the transport.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::continuation::{ContinuationStatus, Progress};
use crate::session::{Session, SessionId};

use super::Transport;

/// Concrete notification payloads, by logical type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NotificationPayload {
    /// One streamed content fragment. `is_final` is true exactly once per
    /// committed turn.
    #[serde(rename = "turn.chunk")]
    TurnChunk {
        agent_id: String,
        content_delta: String,
        is_final: bool,
    },
    /// A tool call was dispatched to the tool executor.
    #[serde(rename = "turn.toolCall")]
    TurnToolCall {
        agent_id: String,
        tool_name: String,
        args: serde_json::Value,
    },
    /// Emitted after each continuation strategy decision.
    #[serde(rename = "continuation.progress")]
    ContinuationProgress {
        agent_id: String,
        iteration: u32,
        status: ContinuationStatus,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
    },
    #[serde(rename = "agent.switched")]
    AgentSwitched {
        from_agent_id: String,
        to_agent_id: String,
    },
    #[serde(rename = "session.error")]
    SessionError {
        agent_id: String,
        error_kind: String,
        message: String,
    },
}

/// Envelope around a payload: session scope, per-session sequence number,
/// and wall-clock timestamp. The sequence number lets a transport detect
/// reordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub session_id: SessionId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: NotificationPayload,
}

/// Thin emitter binding a transport to a session's sequence counter.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Transport>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Stamp and deliver one notification for the given session.
    pub async fn emit(&self, session: &Session, payload: NotificationPayload) {
        self.transport
            .notify(Notification {
                session_id: session.id(),
                seq: session.next_seq(),
                timestamp: Utc::now(),
                payload,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn payload_tags_match_the_wire_protocol() {
        let payload = NotificationPayload::TurnChunk {
            agent_id: "planner".into(),
            content_delta: "hel".into(),
            is_final: false,
        };
        let notification = Notification {
            session_id: Uuid::new_v4(),
            seq: 1,
            timestamp: Utc::now(),
            payload,
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "turn.chunk");
        assert_eq!(json["seq"], 1);
        assert_eq!(json["is_final"], false);
    }

    #[test]
    fn agent_switched_tag() {
        let payload = NotificationPayload::AgentSwitched {
            from_agent_id: "a".into(),
            to_agent_id: "b".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "agent.switched");
    }
}
