//! Conclave — multi-agent conversational session orchestrator.
//!
//! Manages the lifecycle of a conversation between a user and one or more
//! independently configured agents: streams incremental model output to
//! the client, executes model-requested tool invocations, and decides,
//! within iteration and time ceilings, whether a turn must continue with
//! another model call before control returns to the user. Agents exchange
//! asynchronous messages through per-agent mailboxes and can be hot-swapped
//! inside a live session without losing per-agent history.
//!
//! The model backend, tool side effects, and client delivery are external
//! collaborators behind the [`service`] traits.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use conclave::prelude::*;
//!
//! # async fn example(
//! #     completion: Arc<dyn CompletionService>,
//! #     tools: Arc<dyn ToolExecutor>,
//! #     transport: Arc<dyn Transport>,
//! # ) -> conclave::error::Result<()> {
//! let agents = AgentSetConfig::from_toml_str(r#"
//!     [agents.main]
//!     model = "openai:gpt-4o"
//! "#)?;
//! let registry = SessionRegistry::new(agents, "main");
//! let orchestrator = SessionOrchestrator::new(
//!     completion,
//!     tools,
//!     transport,
//!     OrchestratorConfig::from_env(),
//! );
//!
//! let session = registry.create()?;
//! orchestrator
//!     .handle_user_message(&session, "main", "Hello!")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod continuation;
pub mod error;
pub mod executor;
pub mod mailbox;
pub mod orchestrator;
pub mod registry;
pub mod service;
pub mod session;
pub mod types;

/// Commonly used items.
pub mod prelude {
    pub use crate::config::{AgentDefinition, AgentSetConfig, OrchestratorConfig};
    pub use crate::continuation::{ContinuationState, ContinuationStatus, Progress};
    pub use crate::error::{ConclaveError, ModelServiceErrorKind, Result};
    pub use crate::executor::StreamingTurnExecutor;
    pub use crate::mailbox::{Mailbox, MailboxMessage};
    pub use crate::orchestrator::{ExchangeOutcome, SessionOrchestrator};
    pub use crate::registry::SessionRegistry;
    pub use crate::service::{
        CompletionRequest, CompletionService, ControlCommand, Notification, NotificationPayload,
        ToolExecutor, ToolInvocation, ToolSchema, Transport,
    };
    pub use crate::session::{AgentState, ExchangePhase, MessageLog, Session, SessionId};
    pub use crate::types::{
        CompletionEvent, ContinuationSignal, FinishReason, ModelCapabilities, Role, ToolCall,
        ToolResult, Turn, TurnResult,
    };
}
