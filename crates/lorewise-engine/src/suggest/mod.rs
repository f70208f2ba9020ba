/*!
 * # Inline Suggestions
 *
 * Proposed edits from the writing assistant live next to the document as a
 * *pending set* of [`Suggestion`]s. They are purely decorative until
 * accepted: nothing is written into the document when a batch arrives, and
 * rejecting a suggestion never touches the text.
 *
 * ## Pipeline
 *
 * - **`anchoring`**: turns raw edits (relative to the text sent to the
 *   assistant) into suggestions with absolute document ranges
 * - **`decorations`**: derives a render overlay from the pending set
 * - **`remap`**: carries pending ranges through every document mutation
 * - **`controller`**: owns the pending set and resolves accept/reject
 *
 * Every document mutation runs *mutation → remap → redraw*; the
 * [`crate::session::EditorSession`] is the single place that drives it.
 */

pub mod anchoring;
pub mod context;
pub mod controller;
pub mod decorations;
pub mod remap;

use std::ops::Range;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use anchoring::{AnchorFailure, Assignment, DroppedEdit, assign_ranges};
pub use context::{AnchorOptions, RemapOptions, SessionContext};
pub use controller::{AcceptOutcome, BatchOutcome, SuggestionController};
pub use decorations::{Decoration, DecorationKind, DecorationSet, Segment, project, render_markup};
pub use remap::remap_suggestions;

/// Unique identifier for a pending suggestion
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct SuggestionId(pub Uuid);

impl SuggestionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SuggestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of edit a suggestion proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Insert,
    Delete,
    Replace,
}

impl SuggestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SuggestionKind::Insert => "Insert",
            SuggestionKind::Delete => "Delete",
            SuggestionKind::Replace => "Replace",
        }
    }
}

/// A proposed, not-yet-applied edit addressed by a byte range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: SuggestionId,
    pub kind: SuggestionKind,
    /// Half-open byte range in the current document
    pub range: Range<usize>,
    /// Text the range held when the suggestion was anchored (empty for inserts)
    pub old_text: String,
    /// Replacement text (empty for deletes)
    pub new_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Suggestion {
    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self {
            id: SuggestionId::new(),
            kind: SuggestionKind::Insert,
            range: at..at,
            old_text: String::new(),
            new_text: new_text.into(),
            rationale: None,
        }
    }

    pub fn delete(range: Range<usize>, old_text: impl Into<String>) -> Self {
        Self {
            id: SuggestionId::new(),
            kind: SuggestionKind::Delete,
            range,
            old_text: old_text.into(),
            new_text: String::new(),
            rationale: None,
        }
    }

    pub fn replace(
        range: Range<usize>,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            id: SuggestionId::new(),
            kind: SuggestionKind::Replace,
            range,
            old_text: old_text.into(),
            new_text: new_text.into(),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Number of bytes the range covers
    pub fn width(&self) -> usize {
        self.range.end.saturating_sub(self.range.start)
    }

    /// Whether the suggestion addresses a point rather than a span
    pub fn is_point(&self) -> bool {
        self.kind == SuggestionKind::Insert || self.range.is_empty()
    }
}
