//! Continuation strategy — pure decision logic.
//!
//! Given a finished turn and the model's capability descriptor, decide
//! whether the exchange continues with another model call or terminates.
//! This is a pure function: same inputs, same decision, no I/O, no state
//! across calls. It is kept isolated here so the implicit-continuation
//! heuristic (rule 3) can be tuned without touching orchestration code.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::types::{ContinuationSignal, FinishReason, ModelCapabilities, TurnResult};

/// Outcome of one continuation decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ContinuationStatus {
    Continue,
    Terminate,
}

/// Advisory progress summary. Never used for control flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub current_step: u32,
    pub total_steps: u32,
    pub completion_percentage: f64,
    pub steps_completed: u32,
    pub steps_remaining: u32,
}

impl Progress {
    /// Bounded summary derived from the continuation depth and the
    /// iteration ceiling.
    pub fn from_depth(depth: u32, max_iterations: u32) -> Self {
        let total = max_iterations.max(1);
        let completed = depth.min(total);
        Self {
            current_step: (depth + 1).min(total),
            total_steps: total,
            completion_percentage: f64::from(completed) / f64::from(total) * 100.0,
            steps_completed: completed,
            steps_remaining: total - completed,
        }
    }
}

/// Ephemeral decision result; derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContinuationState {
    pub status: ContinuationStatus,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl ContinuationState {
    fn terminate(reason: &str, progress: Progress) -> Self {
        Self {
            status: ContinuationStatus::Terminate,
            reason: reason.to_string(),
            progress: Some(progress),
        }
    }

    fn continue_with(reason: &str, progress: Progress) -> Self {
        Self {
            status: ContinuationStatus::Continue,
            reason: reason.to_string(),
            progress: Some(progress),
        }
    }
}

/// Decide whether the exchange continues, first matching rule wins:
///
/// 1. `depth >= max_iterations`: terminate. The safety valve always wins.
/// 2. A timed-out turn: terminate, even over an explicit CONTINUE.
/// 3. An explicit structured signal in the model output: honored verbatim.
/// 4. A single-tool model that stopped only because it emitted a tool
///    call: continue. The model cannot express "more to do" in one turn's
///    tool-call list, so this absence of signal is read as an implicit
///    continuation request. Heuristic, not a guarantee.
/// 5. Otherwise: terminate.
pub fn decide(
    result: &TurnResult,
    capabilities: &ModelCapabilities,
    depth: u32,
    max_iterations: u32,
    explicit_signal: Option<ContinuationSignal>,
) -> ContinuationState {
    let progress = Progress::from_depth(depth, max_iterations);

    if depth >= max_iterations {
        return ContinuationState::terminate("iteration limit reached", progress);
    }

    if result.finish_reason == FinishReason::Timeout {
        return ContinuationState::terminate("turn deadline expired", progress);
    }

    if let Some(signal) = explicit_signal {
        return match signal {
            ContinuationSignal::Continue => {
                ContinuationState::continue_with("explicit CONTINUE signal", progress)
            }
            ContinuationSignal::Terminate => {
                ContinuationState::terminate("explicit TERMINATE signal", progress)
            }
        };
    }

    if !capabilities.supports_multi_tool_per_turn
        && !result.tool_calls.is_empty()
        && result.finish_reason == FinishReason::ToolCall
    {
        return ContinuationState::continue_with(
            "single-tool model requires continuation after tool execution",
            progress,
        );
    }

    ContinuationState::terminate("no further action indicated", progress)
}
