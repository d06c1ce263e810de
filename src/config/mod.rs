//! Configuration (layered: code > env > agent-set file).
//!
//! Per-agent behavior differences — model, prompt, capabilities,
//! continuation ceilings — are plain data consumed by shared orchestration
//! code, never polymorphic subtypes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConclaveError, Result};
use crate::types::ModelCapabilities;

/// System default iteration ceiling for automatic continuations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
/// System default per-turn deadline.
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 120;

/// One agent's configuration record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDefinition {
    /// Model identifier handed to the completion service, e.g. `openai:gpt-4o`.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
}

/// The configured set of agents available to a session's workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentSetConfig {
    #[serde(default)]
    pub agents: HashMap<String, AgentDefinition>,
}

impl AgentSetConfig {
    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentDefinition> {
        self.agents.get(agent_id)
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.keys().map(|k| k.as_str()).collect()
    }

    /// Parse an agent set from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConclaveError::Configuration(e.to_string()))
    }

    /// Load an agent set from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Builder-style insertion, mostly for tests and embedders.
    pub fn with_agent(mut self, agent_id: impl Into<String>, definition: AgentDefinition) -> Self {
        self.agents.insert(agent_id.into(), definition);
        self
    }
}

/// Orchestrator-wide defaults. Per-agent capability overrides win over
/// these; these win over nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub max_iterations: u32,
    pub turn_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            turn_timeout: Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS),
        }
    }
}

impl OrchestratorConfig {
    /// Load defaults from the environment
    /// (`CONCLAVE_MAX_ITERATIONS`, `CONCLAVE_TURN_TIMEOUT_SECS`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();

        if let Ok(value) = std::env::var("CONCLAVE_MAX_ITERATIONS") {
            if let Ok(parsed) = value.parse() {
                config.max_iterations = parsed;
            }
        }
        if let Ok(value) = std::env::var("CONCLAVE_TURN_TIMEOUT_SECS") {
            if let Ok(parsed) = value.parse() {
                config.turn_timeout = Duration::from_secs(parsed);
            }
        }

        config
    }

    /// Effective iteration ceiling for an agent.
    pub fn max_iterations_for(&self, capabilities: &ModelCapabilities) -> u32 {
        capabilities.max_iterations.unwrap_or(self.max_iterations)
    }

    /// Effective per-turn deadline for an agent.
    pub fn turn_timeout_for(&self, capabilities: &ModelCapabilities) -> Duration {
        capabilities
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.turn_timeout)
    }
}

/// Default location of the agent-set file (`agents.toml` under the user's
/// conclave config directory).
pub fn default_agent_set_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "conclave")
        .map(|dirs| dirs.config_dir().join("agents.toml"))
}
