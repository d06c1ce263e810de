//! Shared test helpers: scripted completion service, mock tool executor,
//! and a recording transport.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use conclave::error::{ConclaveError, Result};
use conclave::prelude::*;

/// One scripted step of a completion stream.
#[derive(Debug, Clone)]
pub enum StreamStep {
    Event(CompletionEvent),
    Error(ModelServiceErrorKind, String),
    /// Never yields again — used to exercise turn deadlines.
    Stall,
}

/// One scripted model call: either a stream of steps, or an up-front
/// service failure.
#[derive(Debug, Clone)]
enum Script {
    Stream(Vec<StreamStep>),
    Fail(ModelServiceErrorKind, String),
}

/// A completion service that replays canned scripts, one per call, and
/// records every request it receives.
#[derive(Default)]
pub struct ScriptedCompletion {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a streamed response for the next call.
    pub fn queue_stream(&self, steps: Vec<StreamStep>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Stream(steps));
    }

    /// Queue a plain text answer that finishes with the given reason.
    pub fn queue_text(&self, text: &str, reason: FinishReason, signal: Option<ContinuationSignal>) {
        self.queue_stream(vec![
            StreamStep::Event(CompletionEvent::ContentDelta { text: text.into() }),
            StreamStep::Event(CompletionEvent::Finish { reason, signal }),
        ]);
    }

    /// Queue an up-front service failure for the next call.
    pub fn queue_failure(&self, kind: ModelServiceErrorKind, message: &str) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Fail(kind, message.into()));
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<conclave::service::CompletionStream> {
        self.requests.lock().unwrap().push(request);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedCompletion: no script queued for this call");

        match script {
            Script::Fail(kind, message) => Err(ConclaveError::model_service(kind, message)),
            Script::Stream(steps) => Ok(async_stream::stream! {
                for step in steps {
                    match step {
                        StreamStep::Event(event) => yield Ok(event),
                        StreamStep::Error(kind, message) => {
                            yield Err(ConclaveError::model_service(kind, message));
                            return;
                        }
                        StreamStep::Stall => {
                            futures::future::pending::<()>().await;
                        }
                    }
                }
            }
            .boxed()),
        }
    }
}

/// A tool executor with canned per-tool results and failure injection.
#[derive(Default)]
pub struct MockTools {
    results: Mutex<HashMap<String, serde_json::Value>>,
    failing: Mutex<HashMap<String, String>>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl MockTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, tool: &str, result: serde_json::Value) -> Self {
        self.results.lock().unwrap().insert(tool.into(), result);
        self
    }

    pub fn with_failure(self, tool: &str, message: &str) -> Self {
        self.failing.lock().unwrap().insert(tool.into(), message.into());
        self
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for MockTools {
    fn schemas(&self, _agent_id: &str) -> Vec<ToolSchema> {
        self.results
            .lock()
            .unwrap()
            .keys()
            .chain(self.failing.lock().unwrap().keys())
            .map(|name| ToolSchema {
                name: name.clone(),
                description: format!("mock tool {name}"),
                parameters: serde_json::json!({ "type": "object" }),
            })
            .collect()
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<serde_json::Value> {
        self.invocations.lock().unwrap().push(invocation.clone());

        if let Some(message) = self.failing.lock().unwrap().get(&invocation.call.name) {
            return Err(ConclaveError::ToolExecution {
                tool_name: invocation.call.name,
                message: message.clone(),
            });
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&invocation.call.name)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "ok": true })))
    }
}

/// A transport that records every notification in delivery order.
#[derive(Default)]
pub struct RecordingTransport {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<NotificationPayload> {
        self.all().into_iter().map(|n| n.payload).collect()
    }

    /// Concatenation of every streamed content delta, in arrival order.
    pub fn streamed_text(&self) -> String {
        self.payloads()
            .into_iter()
            .filter_map(|p| match p {
                NotificationPayload::TurnChunk { content_delta, .. } => Some(content_delta),
                _ => None,
            })
            .collect()
    }

    pub fn final_chunks(&self) -> usize {
        self.payloads()
            .iter()
            .filter(|p| matches!(p, NotificationPayload::TurnChunk { is_final: true, .. }))
            .count()
    }

    pub fn progress_events(&self) -> Vec<NotificationPayload> {
        self.payloads()
            .into_iter()
            .filter(|p| matches!(p, NotificationPayload::ContinuationProgress { .. }))
            .collect()
    }

    pub fn errors(&self) -> Vec<NotificationPayload> {
        self.payloads()
            .into_iter()
            .filter(|p| matches!(p, NotificationPayload::SessionError { .. }))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// Agent set with a trusting multi-tool agent and a single-tool agent.
pub fn test_agent_set() -> AgentSetConfig {
    AgentSetConfig::default()
        .with_agent(
            "planner",
            AgentDefinition {
                model: "test:multi".into(),
                system_prompt: Some("You plan.".into()),
                capabilities: ModelCapabilities::default(),
            },
        )
        .with_agent(
            "scribe",
            AgentDefinition {
                model: "test:single".into(),
                system_prompt: None,
                capabilities: ModelCapabilities::single_tool(),
            },
        )
}

/// Tool-call convenience.
pub fn tool_call(id: &str, name: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: serde_json::json!({}),
    }
}
