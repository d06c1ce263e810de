//! Error types for Conclave.

use thiserror::Error;

use crate::session::SessionId;

/// Primary error type for all Conclave operations.
#[derive(Error, Debug)]
pub enum ConclaveError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model service error ({kind}): {message}")]
    ModelService {
        kind: ModelServiceErrorKind,
        message: String,
    },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Canceled")]
    Canceled,
}

/// Failure mode of the Model Completion Service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ModelServiceErrorKind {
    /// Invalid or expired credentials. Fatal — retrying cannot help.
    Authentication,
    /// The requested model does not exist. Fatal.
    ModelNotFound,
    /// The service asked us to back off. Transient.
    RateLimited,
    /// Connection-level failure. Transient.
    Network,
    /// The service stopped responding mid-stream. Transient.
    Timeout,
}

/// Broad classification used for notification payloads and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    ModelNotFound,
    RateLimit,
    Network,
    Timeout,
    ToolExecution,
    UnknownAgent,
    SessionNotFound,
    Configuration,
    Serialization,
    InvalidState,
    Canceled,
    Unknown,
}

impl ConclaveError {
    /// Convenience constructor for model service failures.
    pub fn model_service(kind: ModelServiceErrorKind, message: impl Into<String>) -> Self {
        Self::ModelService {
            kind,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelService { kind, .. } => match kind {
                ModelServiceErrorKind::Authentication => ErrorCategory::Authentication,
                ModelServiceErrorKind::ModelNotFound => ErrorCategory::ModelNotFound,
                ModelServiceErrorKind::RateLimited => ErrorCategory::RateLimit,
                ModelServiceErrorKind::Network => ErrorCategory::Network,
                ModelServiceErrorKind::Timeout => ErrorCategory::Timeout,
            },
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::UnknownAgent(_) => ErrorCategory::UnknownAgent,
            Self::SessionNotFound(_) => ErrorCategory::SessionNotFound,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::InvalidState(_) => ErrorCategory::InvalidState,
            Self::Canceled => ErrorCategory::Canceled,
            Self::Io(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether re-running the exchange may succeed.
    ///
    /// Tool failures are never surfaced through this type during an exchange
    /// (they are folded into the conversation as error tool results), so this
    /// only matters for model-service and structural failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Timeout
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConclaveError>;
