//! Streaming turn executor: drives one model call to completion.

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::{self, Duration};

use crate::config::OrchestratorConfig;
use crate::error::{ConclaveError, Result};
use crate::service::{
    CompletionRequest, CompletionService, NotificationPayload, Notifier, ToolExecutor,
    ToolInvocation,
};
use crate::session::{AgentState, Session};
use crate::types::{CompletionEvent, FinishReason, ToolCall, ToolResult, Turn, TurnResult};

/// Executes one streaming turn: submit the conversation, forward content
/// deltas to the transport as they arrive, run requested tool calls, and
/// commit exactly one turn to the agent's log when the stream finishes.
pub struct StreamingTurnExecutor {
    completion: Arc<dyn CompletionService>,
    tools: Arc<dyn ToolExecutor>,
    notifier: Notifier,
    config: OrchestratorConfig,
}

impl StreamingTurnExecutor {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        tools: Arc<dyn ToolExecutor>,
        notifier: Notifier,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            completion,
            tools,
            notifier,
            config,
        }
    }

    /// Run one turn for `agent` against the given conversation snapshot.
    ///
    /// On model-service failure no turn is committed; the caller is
    /// responsible for following already-streamed content with an error
    /// notification. Tool failures are folded into the turn as error tool
    /// results and never surface here. Deadline expiry commits a turn with
    /// finish reason `timeout`.
    pub async fn run_turn(
        &self,
        session: &Session,
        agent: &AgentState,
        snapshot: Vec<Turn>,
    ) -> Result<TurnResult> {
        if snapshot.is_empty() {
            return Err(ConclaveError::InvalidState(
                "conversation snapshot must be non-empty".into(),
            ));
        }

        let agent_id = agent.agent_id().to_string();
        let definition = agent.definition();
        let request = CompletionRequest {
            session_id: session.id(),
            agent_id: agent_id.clone(),
            model: definition.model.clone(),
            system_prompt: definition.system_prompt.clone(),
            turns: snapshot,
            tools: self.tools.schemas(&agent_id),
        };

        let timeout = self.config.turn_timeout_for(agent.capabilities());
        let mut stream = self.completion.stream_completion(request).await?;

        tracing::debug!(
            session_id = %session.id(),
            agent_id = %agent_id,
            timeout_secs = timeout.as_secs(),
            "turn start"
        );

        let mut content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut tool_results: Vec<ToolResult> = Vec::new();

        let deadline = time::sleep(timeout);
        tokio::pin!(deadline);
        let cancel = session.cancel_token();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(session_id = %session.id(), agent_id = %agent_id, "turn canceled by session teardown");
                    return Err(ConclaveError::Canceled);
                }
                _ = &mut deadline => {
                    return self
                        .commit_timeout(session, agent, timeout, content, tool_calls, tool_results)
                        .await;
                }
                event = stream.next() => {
                    let Some(event) = event else {
                        // Stream ended without an explicit finish event;
                        // treat it as a clean stop.
                        return self
                            .commit(session, agent, content, tool_calls, tool_results, FinishReason::Stop, None)
                            .await;
                    };
                    match event? {
                        CompletionEvent::ContentDelta { text } => {
                            // Forwarded immediately, never buffered beyond
                            // this one event.
                            content.push_str(&text);
                            self.notifier
                                .emit(session, NotificationPayload::TurnChunk {
                                    agent_id: agent_id.clone(),
                                    content_delta: text,
                                    is_final: false,
                                })
                                .await;
                        }
                        CompletionEvent::ToolCallRequested { call } => {
                            self.notifier
                                .emit(session, NotificationPayload::TurnToolCall {
                                    agent_id: agent_id.clone(),
                                    tool_name: call.name.clone(),
                                    args: call.arguments.clone(),
                                })
                                .await;

                            let invocation = ToolInvocation {
                                session_id: session.id(),
                                agent_id: agent_id.clone(),
                                call: call.clone(),
                            };
                            let execute = self.tools.execute(invocation);
                            tokio::pin!(execute);

                            let result = tokio::select! {
                                _ = cancel.cancelled() => {
                                    tracing::debug!(session_id = %session.id(), agent_id = %agent_id, "tool execution canceled by session teardown");
                                    return Err(ConclaveError::Canceled);
                                }
                                _ = &mut deadline => {
                                    // The in-flight execution is dropped;
                                    // record it as failed so the log stays
                                    // consistent with the call list.
                                    tool_calls.push(call.clone());
                                    tool_results.push(ToolResult::error(
                                        call.id,
                                        "canceled: turn deadline expired",
                                    ));
                                    return self
                                        .commit_timeout(session, agent, timeout, content, tool_calls, tool_results)
                                        .await;
                                }
                                result = &mut execute => result,
                            };

                            let record = match result {
                                Ok(value) => ToolResult::ok(call.id.clone(), value),
                                Err(err) => {
                                    tracing::warn!(
                                        session_id = %session.id(),
                                        agent_id = %agent_id,
                                        tool = %call.name,
                                        error = %err,
                                        "tool execution failed; folding into turn"
                                    );
                                    ToolResult::error(call.id.clone(), err.to_string())
                                }
                            };
                            tool_calls.push(call);
                            tool_results.push(record);
                        }
                        CompletionEvent::Finish { reason, signal } => {
                            return self
                                .commit(session, agent, content, tool_calls, tool_results, reason, signal)
                                .await;
                        }
                    }
                }
            }
        }
    }

    async fn commit(
        &self,
        session: &Session,
        agent: &AgentState,
        content: String,
        tool_calls: Vec<ToolCall>,
        tool_results: Vec<ToolResult>,
        finish_reason: FinishReason,
        signal: Option<crate::types::ContinuationSignal>,
    ) -> Result<TurnResult> {
        let result = TurnResult {
            content,
            tool_calls,
            tool_results,
            finish_reason,
            signal,
        };
        agent.log().append(result.to_turn());

        // Exactly one final chunk per committed turn.
        self.notifier
            .emit(
                session,
                NotificationPayload::TurnChunk {
                    agent_id: agent.agent_id().to_string(),
                    content_delta: String::new(),
                    is_final: true,
                },
            )
            .await;

        tracing::debug!(
            session_id = %session.id(),
            agent_id = %agent.agent_id(),
            finish_reason = %finish_reason,
            tool_calls = result.tool_calls.len(),
            content_len = result.content.len(),
            "turn committed"
        );
        Ok(result)
    }

    async fn commit_timeout(
        &self,
        session: &Session,
        agent: &AgentState,
        timeout: Duration,
        content: String,
        tool_calls: Vec<ToolCall>,
        tool_results: Vec<ToolResult>,
    ) -> Result<TurnResult> {
        tracing::warn!(
            session_id = %session.id(),
            agent_id = %agent.agent_id(),
            timeout_secs = timeout.as_secs(),
            "turn deadline expired; committing partial turn"
        );
        // Any explicit signal seen mid-stream is discarded: a timed-out
        // turn always terminates the exchange.
        self.commit(
            session,
            agent,
            content,
            tool_calls,
            tool_results,
            FinishReason::Timeout,
            None,
        )
        .await
    }
}
