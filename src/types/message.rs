//! Turn types — the units of an agent's message log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stream::{ContinuationSignal, FinishReason};

/// Conversation role for a committed turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    ToolResult,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The outcome of executing one tool call.
///
/// Failures are carried here as data (`is_error` plus an error payload)
/// rather than raised — the model sees "that command failed" on its next
/// turn and decides how to proceed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub result: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(tool_call_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result,
            is_error: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result: serde_json::json!({ "error": message.into() }),
            is_error: true,
        }
    }
}

/// One committed exchange unit in an agent's message log.
///
/// Immutable once appended. A streaming agent response exists only as
/// accumulated executor state until the stream finishes; the `Turn` is
/// committed exactly once, at stream end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            finish_reason: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a committed agent turn from a finished run.
    pub fn agent(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        tool_results: Vec<ToolResult>,
        finish_reason: FinishReason,
    ) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            tool_calls,
            tool_results,
            finish_reason: Some(finish_reason),
            timestamp: Utc::now(),
        }
    }
}

/// Result of one streaming turn executor run.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub finish_reason: FinishReason,
    /// Explicit continuation signal parsed from the model's output, if any.
    pub signal: Option<ContinuationSignal>,
}

impl TurnResult {
    /// View this result as a committable agent turn.
    pub fn to_turn(&self) -> Turn {
        Turn::agent(
            self.content.clone(),
            self.tool_calls.clone(),
            self.tool_results.clone(),
            self.finish_reason,
        )
    }
}
