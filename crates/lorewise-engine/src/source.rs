//! Contract with the writing assistant that proposes edits.
//!
//! A source receives the text of a reference span plus an instruction and
//! returns one [`EditProposal`]. Offsets in the proposal are relative to the
//! span text and carry no guarantee of stability; anchoring happens later in
//! [`crate::suggest::assign_ranges`]. One request yields one response; the
//! engine never retries.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::suggest::SuggestionKind;

/// An edit as the assistant described it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdit {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(default)]
    pub old_text: String,
    #[serde(default)]
    pub new_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Optional byte offset of `old_text` (or the insertion point) within the span
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// An entry of `edits` that could not be read as a [`RawEdit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEdit {
    /// Position in the response's `edits` array
    pub index: usize,
    pub reason: String,
}

/// Whole response from a suggestion source.
///
/// Edits are read one at a time: an entry with an unknown `type` or a bad
/// field lands in `malformed` and the rest of the batch is kept. A response
/// with an `error` and no explicit `success` counts as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ProposalWire")]
pub struct EditProposal {
    pub edits: Vec<RawEdit>,
    pub summary: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub malformed: Vec<MalformedEdit>,
}

#[derive(Deserialize)]
struct ProposalWire {
    #[serde(default)]
    edits: Vec<serde_json::Value>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

impl From<ProposalWire> for EditProposal {
    fn from(wire: ProposalWire) -> Self {
        let mut edits = Vec::with_capacity(wire.edits.len());
        let mut malformed = Vec::new();
        for (index, value) in wire.edits.into_iter().enumerate() {
            match serde_json::from_value::<RawEdit>(value) {
                Ok(edit) => edits.push(edit),
                Err(err) => malformed.push(MalformedEdit {
                    index,
                    reason: err.to_string(),
                }),
            }
        }

        let error = wire
            .error
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        Self {
            edits,
            summary: wire.summary.unwrap_or_default(),
            success: wire.success.unwrap_or(error.is_none()),
            error,
            malformed,
        }
    }
}

impl EditProposal {
    pub fn new(edits: Vec<RawEdit>, summary: impl Into<String>) -> Self {
        Self {
            edits,
            summary: summary.into(),
            success: true,
            error: None,
            malformed: Vec::new(),
        }
    }

    /// Treat a proposal flagged as unsuccessful, or carrying an error, as a source error
    pub fn into_result(self) -> Result<Self, SourceError> {
        if self.success && self.error.is_none() {
            Ok(self)
        } else {
            Err(SourceError::Rejected(
                self.error
                    .unwrap_or_else(|| "assistant reported failure".to_string()),
            ))
        }
    }

    /// Position in the response's `edits` array of each entry of `self.edits`
    pub fn response_indices(&self) -> Vec<usize> {
        let total = self.edits.len() + self.malformed.len();
        (0..total)
            .filter(|i| !self.malformed.iter().any(|m| m.index == *i))
            .collect()
    }
}

/// Lore entry, character sheet or other material sent alongside the span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMaterial {
    pub title: String,
    pub content: String,
}

impl ReferenceMaterial {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Everything a source needs to propose edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalRequest {
    pub span_text: String,
    pub instruction: String,
    pub references: Vec<ReferenceMaterial>,
}

/// Whole-request failure from a suggestion source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("request to assistant failed: {0}")]
    Transport(String),
    #[error("assistant returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse assistant response: {0}")]
    Parse(String),
    #[error("assistant declined the request: {0}")]
    Rejected(String),
}

/// Something that proposes edits for a span of text
pub trait SuggestionSource {
    fn propose_edits(
        &self,
        request: &ProposalRequest,
    ) -> impl Future<Output = Result<EditProposal, SourceError>> + Send;
}
