//! Append-only per-agent message log.

use std::sync::Mutex;

use crate::types::Turn;

/// Ordered record of committed turns for one agent within one session.
///
/// Turns are never reordered or deleted. Only the owning agent's
/// orchestration path writes here; cross-agent data flow goes through the
/// mailbox instead.
#[derive(Debug, Default)]
pub struct MessageLog {
    turns: Mutex<Vec<Turn>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a turn. Turns are committed in completion order; since at
    /// most one turn runs at a time per agent, this is append order.
    pub fn append(&self, turn: Turn) {
        self.turns.lock().expect("log lock poisoned").push(turn);
    }

    /// Ordered copy of the full log, used as the conversation snapshot for
    /// the next model call.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.lock().expect("log lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.turns.lock().expect("log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<Turn> {
        self.turns.lock().expect("log lock poisoned").last().cloned()
    }
}
