//! Process-wide table of live sessions.
//!
//! The map lock guards only insert/lookup/delete; it is never held across
//! model calls or tool execution. Per-session work runs entirely outside
//! it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::AgentSetConfig;
use crate::error::{ConclaveError, Result};
use crate::orchestrator::SessionOrchestrator;
use crate::service::ControlCommand;
use crate::session::{Session, SessionId};

/// Thread-safe registry of live sessions keyed by session id.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    agent_set: AgentSetConfig,
    default_agent_id: String,
}

impl SessionRegistry {
    pub fn new(agent_set: AgentSetConfig, default_agent_id: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            agent_set,
            default_agent_id: default_agent_id.into(),
        }
    }

    /// Create a new session with this registry's agent set, starting on the
    /// default agent.
    pub fn create(&self) -> Result<Arc<Session>> {
        let session = Arc::new(Session::new(self.agent_set.clone(), &self.default_agent_id)?);
        self.sessions
            .write()
            .expect("registry lock poisoned")
            .insert(session.id(), session.clone());
        tracing::debug!(session_id = %session.id(), "session created");
        Ok(session)
    }

    pub fn get(&self, session_id: SessionId) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .expect("registry lock poisoned")
            .get(&session_id)
            .cloned()
            .ok_or(ConclaveError::SessionNotFound(session_id))
    }

    /// Tear a session down: cancel in-flight work, close every mailbox,
    /// and drop it from the table.
    pub fn destroy(&self, session_id: SessionId) -> Result<()> {
        let session = self
            .sessions
            .write()
            .expect("registry lock poisoned")
            .remove(&session_id)
            .ok_or(ConclaveError::SessionNotFound(session_id))?;
        // Teardown happens outside the map lock.
        session.close();
        tracing::debug!(session_id = %session_id, "session destroyed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .expect("registry lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Route an inbound control command to the right session.
    pub async fn dispatch(
        &self,
        orchestrator: &SessionOrchestrator,
        command: ControlCommand,
    ) -> Result<()> {
        match command {
            ControlCommand::UserMessage {
                session_id,
                agent_id,
                text,
            } => {
                let session = self.get(session_id)?;
                orchestrator
                    .handle_user_message(&session, &agent_id, text)
                    .await?;
                Ok(())
            }
            ControlCommand::SwitchAgent {
                session_id,
                agent_id,
            } => {
                let session = self.get(session_id)?;
                orchestrator.switch_agent(&session, &agent_id).await
            }
            ControlCommand::CloseSession { session_id } => self.destroy(session_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentDefinition;
    use crate::types::ModelCapabilities;
    use uuid::Uuid;

    fn registry() -> SessionRegistry {
        let set = AgentSetConfig::default().with_agent(
            "main",
            AgentDefinition {
                model: "test:model".into(),
                system_prompt: None,
                capabilities: ModelCapabilities::default(),
            },
        );
        SessionRegistry::new(set, "main")
    }

    #[test]
    fn create_get_destroy_roundtrip() {
        let registry = registry();
        let session = registry.create().unwrap();
        assert_eq!(registry.len(), 1);

        let looked_up = registry.get(session.id()).unwrap();
        assert_eq!(looked_up.id(), session.id());

        registry.destroy(session.id()).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(session.id()),
            Err(ConclaveError::SessionNotFound(_))
        ));
    }

    #[test]
    fn destroy_cancels_the_session() {
        let registry = registry();
        let session = registry.create().unwrap();
        registry.destroy(session.id()).unwrap();
        assert!(session.cancel_token().is_cancelled());
    }

    #[test]
    fn destroy_unknown_session_fails() {
        let registry = registry();
        assert!(matches!(
            registry.destroy(Uuid::new_v4()),
            Err(ConclaveError::SessionNotFound(_))
        ));
    }

    #[test]
    fn sessions_are_independent() {
        let registry = registry();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len(), 2);

        registry.destroy(a.id()).unwrap();
        assert!(registry.get(b.id()).is_ok());
        assert!(!b.cancel_token().is_cancelled());
    }
}
