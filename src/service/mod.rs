//! External collaborator boundaries.
//!
//! The core consumes three services and owns none of their implementations:
//! a [`CompletionService`] that runs the language model and streams results,
//! a [`ToolExecutor`] that performs side-effecting actions, and a
//! [`Transport`] that delivers ordered notifications to the client.

pub mod notification;

pub use notification::{Notification, NotificationPayload, Notifier};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::{ConclaveError, Result};
use crate::session::SessionId;
use crate::types::{CompletionEvent, ToolCall, Turn};

/// Declared schema of one tool, passed to the completion service so the
/// model knows what it may call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One model call: an ordered conversation plus the declared tool schemas.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub session_id: SessionId,
    pub agent_id: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolSchema>,
}

/// Ordered, cancellable stream of completion events. Dropping the stream
/// cancels the underlying model call.
pub type CompletionStream = BoxStream<'static, std::result::Result<CompletionEvent, ConclaveError>>;

/// Runs the language model and streams back incremental results.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Submit a conversation and receive an event stream
    /// (`content_delta | tool_call_requested | finish`).
    async fn stream_completion(&self, request: CompletionRequest) -> Result<CompletionStream>;
}

/// One tool invocation with its calling context.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub session_id: SessionId,
    pub agent_id: String,
    pub call: ToolCall,
}

/// Performs a model-requested side effect.
///
/// Must be safe to cancel: the executor may drop the returned future on
/// turn timeout or session teardown.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Declared schemas for the tools available to an agent.
    fn schemas(&self, agent_id: &str) -> Vec<ToolSchema>;

    /// Execute one tool call, returning a success payload or a structured
    /// error. Errors are folded into the conversation as error tool
    /// results; they never abort the exchange.
    async fn execute(&self, invocation: ToolInvocation) -> Result<serde_json::Value>;
}

/// Delivers ordered, asynchronous notifications to a connected client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Inbound control command routed by the session registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    UserMessage {
        session_id: SessionId,
        agent_id: String,
        text: String,
    },
    SwitchAgent {
        session_id: SessionId,
        agent_id: String,
    },
    CloseSession {
        session_id: SessionId,
    },
}
