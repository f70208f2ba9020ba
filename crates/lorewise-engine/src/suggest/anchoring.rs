use std::ops::Range;

use crate::source::RawEdit;
use crate::suggest::{SessionContext, Suggestion, SuggestionId, SuggestionKind};

/// Why a raw edit could not be anchored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorFailure {
    #[error("edit has no old text to locate")]
    EmptyOldText,
    #[error("old text not found in the reference span")]
    NotFound,
    #[error("offset {offset} is outside the reference span (length {span_len})")]
    OffsetOutOfBounds { offset: usize, span_len: usize },
    #[error("offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
    #[error("anchored text was edited while the request was in flight")]
    EditedInFlight,
    #[error("edit could not be read: {0}")]
    Malformed(String),
}

/// A raw edit that was left out of the pending set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdit {
    /// Position of the edit in the batch it arrived in
    pub index: usize,
    pub reason: AnchorFailure,
}

/// Result of anchoring one batch
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    pub suggestions: Vec<Suggestion>,
    /// Batch position of each entry in `suggestions`
    pub batch_index: Vec<usize>,
    pub dropped: Vec<DroppedEdit>,
}

impl Assignment {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Anchor a batch of raw edits to absolute document ranges.
///
/// `reference_text` is the span that was sent to the assistant and
/// `span_offset` is where it begins in the document. Edits that cannot be
/// located are dropped individually; the rest of the batch is kept.
///
/// Repeated phrases are resolved in batch order: a `delete`/`replace` is
/// searched for from the end of the previous anchored span first, then
/// from the start of the reference text. The output ranges depend only on
/// the inputs.
pub fn assign_ranges(
    ctx: &SessionContext,
    reference_text: &str,
    span_offset: usize,
    batch: &[RawEdit],
) -> Assignment {
    let mut assignment = Assignment::default();
    let mut cursor = 0;

    for (index, raw) in batch.iter().enumerate() {
        match locate(ctx, reference_text, cursor, raw) {
            Ok(local) => {
                if raw.kind != SuggestionKind::Insert {
                    cursor = local.end;
                }
                assignment.batch_index.push(index);
                assignment.suggestions.push(Suggestion {
                    id: SuggestionId::new(),
                    kind: raw.kind,
                    range: (span_offset + local.start)..(span_offset + local.end),
                    old_text: match raw.kind {
                        SuggestionKind::Insert => String::new(),
                        _ => raw.old_text.clone(),
                    },
                    new_text: match raw.kind {
                        SuggestionKind::Delete => String::new(),
                        _ => raw.new_text.clone(),
                    },
                    rationale: raw
                        .rationale
                        .as_ref()
                        .map(|r| r.trim())
                        .filter(|r| !r.is_empty())
                        .map(str::to_string),
                });
            }
            Err(reason) => {
                log::debug!(
                    "[{}] dropping {} edit #{index}: {reason}",
                    ctx.session_id,
                    raw.kind.label()
                );
                assignment.dropped.push(DroppedEdit { index, reason });
            }
        }
    }

    assignment
}

/// Find the span of `raw` inside `reference_text`, relative to the span start
fn locate(
    ctx: &SessionContext,
    reference_text: &str,
    cursor: usize,
    raw: &RawEdit,
) -> Result<Range<usize>, AnchorFailure> {
    let span_len = reference_text.len();

    if raw.kind == SuggestionKind::Insert {
        return match raw.offset {
            Some(offset) => {
                check_hint(reference_text, offset)?;
                Ok(offset..offset)
            }
            // No position given: treat the insert as a continuation of the span
            None => Ok(span_len..span_len),
        };
    }

    let needle = raw.old_text.as_str();
    if needle.is_empty() {
        return Err(AnchorFailure::EmptyOldText);
    }

    if ctx.anchor.prefer_offset_hint
        && let Some(offset) = raw.offset
    {
        check_hint(reference_text, offset)?;
        let end = offset.saturating_add(needle.len());
        if reference_text.get(offset..end) == Some(needle) {
            return Ok(offset..end);
        }
    }

    let start = reference_text
        .get(cursor..)
        .and_then(|rest| rest.find(needle))
        .map(|found| cursor + found)
        .or_else(|| reference_text.find(needle))
        .ok_or(AnchorFailure::NotFound)?;

    Ok(start..start + needle.len())
}

fn check_hint(reference_text: &str, offset: usize) -> Result<(), AnchorFailure> {
    if offset > reference_text.len() {
        return Err(AnchorFailure::OffsetOutOfBounds {
            offset,
            span_len: reference_text.len(),
        });
    }
    if !reference_text.is_char_boundary(offset) {
        return Err(AnchorFailure::NotCharBoundary { offset });
    }
    Ok(())
}
