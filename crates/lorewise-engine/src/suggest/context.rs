use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editing::Bias;

/// How suggestion ranges follow edits made exactly at their edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapOptions {
    /// Bias for the start of a span; `After` keeps text typed at the start outside the span
    pub start_bias: Bias,
    /// Bias for the end of a span; `Before` keeps text typed at the end outside the span
    pub end_bias: Bias,
    /// Bias for both ends of zero-width (insert) suggestions
    pub point_bias: Bias,
}

impl Default for RemapOptions {
    fn default() -> Self {
        Self {
            start_bias: Bias::After,
            end_bias: Bias::Before,
            point_bias: Bias::After,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorOptions {
    /// Trust an edit's `offset` hint when it points exactly at its `oldText`
    pub prefer_offset_hint: bool,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            prefer_offset_hint: true,
        }
    }
}

/// Per-editor-session state shared by the suggestion components.
///
/// Built once when an editor opens and passed by reference to anchoring,
/// projection, remapping and reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Correlates log lines from one editor instance
    pub session_id: Uuid,
    pub remap: RemapOptions,
    pub anchor: AnchorOptions,
    /// Number of recent patches kept for rebasing in-flight requests
    pub history_limit: usize,
}

impl SessionContext {
    pub const DEFAULT_HISTORY_LIMIT: usize = 64;

    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            remap: RemapOptions::default(),
            anchor: AnchorOptions::default(),
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_remap(mut self, remap: RemapOptions) -> Self {
        self.remap = remap;
        self
    }

    pub fn with_anchor(mut self, anchor: AnchorOptions) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
