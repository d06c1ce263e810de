//! Completion stream event types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::ToolCall;

/// Why the model stopped emitting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    /// The model judged the task complete.
    Stop,
    /// The model stopped because it emitted a tool call.
    ToolCall,
    /// Output token limit reached.
    Length,
    /// Provider-side content filtering.
    ContentFilter,
    /// The per-turn deadline expired; the turn was committed as-is.
    Timeout,
    /// The stream ended abnormally.
    Error,
}

/// Explicit structured continuation signal embedded in model output.
///
/// When present it is honored verbatim by the continuation strategy (safety
/// ceilings aside) — see [`crate::continuation::decide`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ContinuationSignal {
    Continue,
    Terminate,
}

/// An incremental event from the Model Completion Service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionEvent {
    /// Incremental text content. Forwarded to the transport immediately,
    /// never buffered beyond one event.
    ContentDelta { text: String },
    /// The model requests a tool invocation. The stream does not resume
    /// until the tool result is available.
    ToolCallRequested { call: ToolCall },
    /// The stream ended.
    Finish {
        reason: FinishReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<ContinuationSignal>,
    },
}
