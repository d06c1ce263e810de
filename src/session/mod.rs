//! Session state: per-agent execution contexts and the agent switch
//! coordinator.

pub mod log;

pub use log::MessageLog;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{AgentDefinition, AgentSetConfig};
use crate::error::{ConclaveError, Result};
use crate::mailbox::{Mailbox, MailboxMessage};
use crate::types::ModelCapabilities;

/// Opaque session identifier.
pub type SessionId = Uuid;

/// Where the session's current exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExchangePhase {
    /// No exchange in flight; ready for the next user message.
    Idle,
    /// A model call is streaming.
    AwaitingModel,
    /// A continuation decision said CONTINUE; another model call is queued.
    Continuing,
    /// The exchange ended in an error. The session remains usable.
    Error,
}

/// One agent's isolated execution context within a session.
///
/// The message log is read and mutated only through the owning session's
/// orchestration path; other agents reach this agent via its mailbox.
#[derive(Debug)]
pub struct AgentState {
    agent_id: String,
    definition: AgentDefinition,
    log: MessageLog,
    mailbox: Mailbox,
}

impl AgentState {
    fn new(agent_id: impl Into<String>, definition: AgentDefinition) -> Self {
        Self {
            agent_id: agent_id.into(),
            definition,
            log: MessageLog::new(),
            mailbox: Mailbox::new(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    pub fn capabilities(&self) -> &ModelCapabilities {
        &self.definition.capabilities
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

/// Outcome of a hot-swap of the active agent.
#[derive(Debug, Clone)]
pub struct AgentSwitch {
    pub from_agent_id: String,
    pub to_agent_id: String,
}

/// One logical conversation with a client connection.
///
/// Owns the per-agent states and mailboxes; destroyed on explicit close or
/// transport disconnect. All fields are internally synchronized so a
/// session can be shared as `Arc<Session>` between the registry and the
/// orchestrator task.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    agent_set: AgentSetConfig,
    agents: Mutex<HashMap<String, Arc<AgentState>>>,
    active_agent_id: Mutex<String>,
    continuation_depth: AtomicU32,
    seq: AtomicU64,
    cancel: CancellationToken,
    run_lock: tokio::sync::Mutex<()>,
    phase_tx: watch::Sender<ExchangePhase>,
    phase_rx: watch::Receiver<ExchangePhase>,
}

impl Session {
    /// Create a session with the given agent set and initial active agent.
    ///
    /// The active agent's state is created eagerly; the rest of the set is
    /// created lazily on first use or switch.
    pub fn new(agent_set: AgentSetConfig, active_agent_id: &str) -> Result<Self> {
        let definition = agent_set
            .get(active_agent_id)
            .cloned()
            .ok_or_else(|| ConclaveError::UnknownAgent(active_agent_id.to_string()))?;

        let mut agents = HashMap::new();
        agents.insert(
            active_agent_id.to_string(),
            Arc::new(AgentState::new(active_agent_id, definition)),
        );

        let (phase_tx, phase_rx) = watch::channel(ExchangePhase::Idle);
        Ok(Self {
            id: Uuid::new_v4(),
            agent_set,
            agents: Mutex::new(agents),
            active_agent_id: Mutex::new(active_agent_id.to_string()),
            continuation_depth: AtomicU32::new(0),
            seq: AtomicU64::new(1),
            cancel: CancellationToken::new(),
            run_lock: tokio::sync::Mutex::new(()),
            phase_tx,
            phase_rx,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn active_agent_id(&self) -> String {
        self.active_agent_id
            .lock()
            .expect("session lock poisoned")
            .clone()
    }

    /// Get (or lazily create) the state for a configured agent.
    pub fn agent(&self, agent_id: &str) -> Result<Arc<AgentState>> {
        let mut agents = self.agents.lock().expect("session lock poisoned");
        if let Some(state) = agents.get(agent_id) {
            return Ok(state.clone());
        }
        let definition = self
            .agent_set
            .get(agent_id)
            .cloned()
            .ok_or_else(|| ConclaveError::UnknownAgent(agent_id.to_string()))?;
        let state = Arc::new(AgentState::new(agent_id, definition));
        agents.insert(agent_id.to_string(), state.clone());
        Ok(state)
    }

    /// Get an agent's state only if it already exists.
    pub fn existing_agent(&self, agent_id: &str) -> Option<Arc<AgentState>> {
        self.agents
            .lock()
            .expect("session lock poisoned")
            .get(agent_id)
            .cloned()
    }

    /// Hot-swap the active agent.
    ///
    /// The previous agent's state (log and mailbox included) is retained,
    /// so switching back resumes prior context. Fails with `UnknownAgent`
    /// if the target is not in the configured set. Switching to the agent
    /// that is already active is a no-op swap, reported as such.
    pub fn switch_agent(&self, new_agent_id: &str) -> Result<AgentSwitch> {
        // Validate + lazily create before taking the active-id lock.
        self.agent(new_agent_id)?;

        let mut active = self.active_agent_id.lock().expect("session lock poisoned");
        let from = std::mem::replace(&mut *active, new_agent_id.to_string());
        Ok(AgentSwitch {
            from_agent_id: from,
            to_agent_id: new_agent_id.to_string(),
        })
    }

    /// Enqueue a mailbox message for another agent in this session.
    ///
    /// The recipient's state is created lazily if it is configured but not
    /// yet instantiated, so an agent can message a peer that has not spoken
    /// yet.
    pub fn send_mail(
        &self,
        from: &str,
        to: &str,
        body: impl Into<String>,
        thread_id: Option<String>,
    ) -> Result<()> {
        let recipient = self.agent(to)?;
        let delivered = recipient
            .mailbox()
            .send(MailboxMessage::new(from, to, body, thread_id));
        if !delivered {
            return Err(ConclaveError::InvalidState(format!(
                "mailbox for agent {to} is closed"
            )));
        }
        Ok(())
    }

    // -- Exchange bookkeeping (used by the orchestrator) --

    pub fn continuation_depth(&self) -> u32 {
        self.continuation_depth.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_continuation_depth(&self) {
        self.continuation_depth.store(0, Ordering::SeqCst);
    }

    pub(crate) fn increment_continuation_depth(&self) -> u32 {
        self.continuation_depth.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Next per-session notification sequence number.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn phase(&self) -> ExchangePhase {
        *self.phase_rx.borrow()
    }

    /// Subscribe to exchange phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<ExchangePhase> {
        self.phase_rx.clone()
    }

    pub(crate) fn set_phase(&self, phase: ExchangePhase) {
        let _ = self.phase_tx.send(phase);
    }

    /// Serializes turn runs: at most one streaming turn per session.
    pub(crate) fn run_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.run_lock
    }

    /// Token canceled on session teardown.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Tear the session down: cancel in-flight work and close every
    /// mailbox. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
        let agents = self.agents.lock().expect("session lock poisoned");
        for state in agents.values() {
            state.mailbox().close();
        }
    }
}
