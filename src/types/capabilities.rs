//! Static per-model capability descriptors.

use serde::{Deserialize, Serialize};

/// What a model backend can and cannot do within one turn, plus per-agent
/// safety-ceiling overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelCapabilities {
    /// Whether the model can batch several tool calls in one turn and say
    /// explicitly when it is done. Models where this is `false` require a
    /// continuation after every single tool call if more work remains.
    #[serde(default = "default_multi_tool")]
    pub supports_multi_tool_per_turn: bool,
    /// Per-agent iteration ceiling; falls back to the system default.
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Per-agent turn deadline in seconds; falls back to the system default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_multi_tool() -> bool {
    true
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            supports_multi_tool_per_turn: true,
            max_iterations: None,
            timeout_secs: None,
        }
    }
}

impl ModelCapabilities {
    /// Descriptor for a backend limited to one tool call per turn.
    pub fn single_tool() -> Self {
        Self {
            supports_multi_tool_per_turn: false,
            ..Self::default()
        }
    }
}
