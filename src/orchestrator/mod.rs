//! Session orchestrator: owns one conversational exchange at a time.
//!
//! `Idle → AwaitingModel → (Continuing ⇄ AwaitingModel) → Idle`, with a
//! per-exchange `Error` phase reachable from any in-flight state. Turns
//! within a session are strictly sequential; the session's run lock is the
//! invariant, not an optimization, because model conversation state is
//! order-dependent.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use crate::config::OrchestratorConfig;
use crate::continuation::{self, ContinuationStatus};
use crate::error::{ConclaveError, Result};
use crate::executor::StreamingTurnExecutor;
use crate::service::{
    CompletionService, NotificationPayload, Notifier, ToolExecutor, Transport,
};
use crate::session::{AgentState, ExchangePhase, Session};
use crate::types::{Turn, TurnResult};

/// Outcome of one full exchange (user message through zero or more
/// automatic continuations).
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    /// Result of the final turn in the exchange.
    pub final_turn: TurnResult,
    /// How many automatic continuations ran.
    pub continuations: u32,
}

/// Drives exchanges for sessions: runs streaming turns, applies the
/// continuation strategy between them, enforces iteration and time
/// ceilings, and emits progress notifications.
pub struct SessionOrchestrator {
    executor: StreamingTurnExecutor,
    notifier: Notifier,
    config: OrchestratorConfig,
}

impl SessionOrchestrator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        tools: Arc<dyn ToolExecutor>,
        transport: Arc<dyn Transport>,
        config: OrchestratorConfig,
    ) -> Self {
        let notifier = Notifier::new(transport);
        let executor =
            StreamingTurnExecutor::new(completion, tools, notifier.clone(), config.clone());
        Self {
            executor,
            notifier,
            config,
        }
    }

    /// Handle an inbound user message for the given agent: append it to the
    /// agent's log, reset the continuation depth, and run the exchange to a
    /// TERMINATE decision.
    pub async fn handle_user_message(
        &self,
        session: &Arc<Session>,
        agent_id: &str,
        text: impl Into<String>,
    ) -> Result<ExchangeOutcome> {
        let agent = session.agent(agent_id)?;
        self.run_exchange(session, &agent, Turn::user(text)).await
    }

    /// Wake an agent that is sleeping on its mailbox.
    ///
    /// Waits up to `wait` for mail (pass `Duration::ZERO` to poll), drains
    /// everything queued, and runs one exchange with the drained messages
    /// injected as synthetic input — exactly the way a user message would
    /// run. Returns `None` if no mail arrived.
    pub async fn handle_mailbox_tick(
        &self,
        session: &Arc<Session>,
        agent_id: &str,
        wait: Duration,
    ) -> Result<Option<ExchangeOutcome>> {
        let agent = session.agent(agent_id)?;

        let Some(first) = agent.mailbox().receive(Some(wait)).await else {
            return Ok(None);
        };
        let mut batch = vec![first];
        while let Some(message) = agent.mailbox().try_receive() {
            batch.push(message);
        }

        let mut text = String::new();
        for message in &batch {
            let _ = writeln!(text, "[message from {}] {}", message.from, message.body);
        }
        tracing::debug!(
            session_id = %session.id(),
            agent_id = %agent_id,
            messages = batch.len(),
            "mailbox wake"
        );

        self.run_exchange(session, &agent, Turn::user(text.trim_end()))
            .await
            .map(Some)
    }

    /// Hot-swap the session's active agent and notify the client.
    pub async fn switch_agent(&self, session: &Arc<Session>, new_agent_id: &str) -> Result<()> {
        let switch = session.switch_agent(new_agent_id)?;
        tracing::debug!(
            session_id = %session.id(),
            from = %switch.from_agent_id,
            to = %switch.to_agent_id,
            "agent switched"
        );
        self.notifier
            .emit(
                session,
                NotificationPayload::AgentSwitched {
                    from_agent_id: switch.from_agent_id,
                    to_agent_id: switch.to_agent_id,
                },
            )
            .await;
        Ok(())
    }

    /// Run one exchange to completion: initial turn, then zero or more
    /// automatic continuations, until the continuation strategy terminates.
    async fn run_exchange(
        &self,
        session: &Arc<Session>,
        agent: &Arc<AgentState>,
        initial_turn: Turn,
    ) -> Result<ExchangeOutcome> {
        // A wake or user message queues behind the session's current turn.
        let _run_guard = session.run_lock().lock().await;
        if session.cancel_token().is_cancelled() {
            return Err(ConclaveError::Canceled);
        }

        agent.log().append(initial_turn);
        session.reset_continuation_depth();

        let capabilities = agent.capabilities().clone();
        let max_iterations = self.config.max_iterations_for(&capabilities);

        loop {
            session.set_phase(ExchangePhase::AwaitingModel);

            let snapshot = agent.log().snapshot();
            let result = match self.executor.run_turn(session, agent, snapshot).await {
                Ok(result) => result,
                Err(ConclaveError::Canceled) => {
                    session.set_phase(ExchangePhase::Idle);
                    return Err(ConclaveError::Canceled);
                }
                Err(err) => {
                    return self.fail_exchange(session, agent, err).await;
                }
            };

            let depth = session.continuation_depth();
            let decision = continuation::decide(
                &result,
                &capabilities,
                depth,
                max_iterations,
                result.signal,
            );

            self.notifier
                .emit(
                    session,
                    NotificationPayload::ContinuationProgress {
                        agent_id: agent.agent_id().to_string(),
                        iteration: depth,
                        status: decision.status,
                        reason: decision.reason.clone(),
                        progress: decision.progress.clone(),
                    },
                )
                .await;

            match decision.status {
                ContinuationStatus::Continue => {
                    let depth = session.increment_continuation_depth();
                    session.set_phase(ExchangePhase::Continuing);
                    tracing::debug!(
                        session_id = %session.id(),
                        agent_id = %agent.agent_id(),
                        depth,
                        reason = %decision.reason,
                        "continuing exchange"
                    );
                    // No user input between automatic continuations.
                }
                ContinuationStatus::Terminate => {
                    session.set_phase(ExchangePhase::Idle);
                    tracing::debug!(
                        session_id = %session.id(),
                        agent_id = %agent.agent_id(),
                        continuations = depth,
                        reason = %decision.reason,
                        "exchange complete"
                    );
                    return Ok(ExchangeOutcome {
                        final_turn: result,
                        continuations: depth,
                    });
                }
            }
        }
    }

    /// Close the exchange on a model-service failure: the error never
    /// consumes a continuation-depth slot (a retry starts a fresh count)
    /// and never ends the session itself.
    async fn fail_exchange(
        &self,
        session: &Arc<Session>,
        agent: &Arc<AgentState>,
        err: ConclaveError,
    ) -> Result<ExchangeOutcome> {
        session.set_phase(ExchangePhase::Error);
        session.reset_continuation_depth();
        tracing::warn!(
            session_id = %session.id(),
            agent_id = %agent.agent_id(),
            error = %err,
            "exchange failed"
        );
        self.notifier
            .emit(
                session,
                NotificationPayload::SessionError {
                    agent_id: agent.agent_id().to_string(),
                    error_kind: err.category().to_string(),
                    message: err.to_string(),
                },
            )
            .await;
        // Phase stays at Error until the next exchange begins; the session
        // itself remains usable.
        Err(err)
    }
}
