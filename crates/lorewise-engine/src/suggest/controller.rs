use crate::editing::{Cmd, Document, Patch};
use crate::suggest::{SessionContext, Suggestion, SuggestionId, SuggestionKind, remap_suggestions};

/// Result of accepting one suggestion
#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    /// The edit was written to the document
    Applied(Patch),
    /// The anchored text no longer matches; the suggestion was dropped unapplied
    Stale,
    /// No pending suggestion has this id (already resolved)
    NotFound,
}

impl AcceptOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, AcceptOutcome::Applied(_))
    }
}

/// Result of accepting the whole pending set
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub applied: Vec<SuggestionId>,
    /// Suggestions resolved without being applied, because an earlier accept
    /// in the batch overlapped them
    pub dropped: Vec<SuggestionId>,
    /// Patches in the order they were applied
    pub patches: Vec<Patch>,
}

/// Owns the pending set for one editor session and resolves suggestions.
///
/// Suggestions are decorative until accepted: a batch never writes to the
/// document, and rejecting only removes the suggestion. Every accept is one
/// transaction over the pending set and the document: either the edit is
/// applied and the suggestion removed, or (when its anchored text has gone
/// stale) the suggestion is removed and the document is left alone. Unknown
/// ids are no-ops so repeated clicks are harmless.
#[derive(Debug, Clone, Default)]
pub struct SuggestionController {
    pending: Vec<Suggestion>,
}

impl SuggestionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending set with a new batch.
    ///
    /// Previous suggestions are discarded unresolved. Duplicate ids keep the
    /// first occurrence. Returns the number of suggestions now pending.
    pub fn set_suggestions(&mut self, ctx: &SessionContext, batch: Vec<Suggestion>) -> usize {
        let replaced = self.pending.len();
        let mut pending: Vec<Suggestion> = Vec::with_capacity(batch.len());
        for suggestion in batch {
            if pending.iter().any(|existing| existing.id == suggestion.id) {
                log::warn!(
                    "[{}] ignoring duplicate suggestion id {}",
                    ctx.session_id,
                    suggestion.id
                );
                continue;
            }
            pending.push(suggestion);
        }
        self.pending = pending;
        log::debug!(
            "[{}] installed {} suggestions (replaced {replaced})",
            ctx.session_id,
            self.pending.len()
        );
        self.pending.len()
    }

    /// Snapshot of the pending set in arrival order
    pub fn pending(&self) -> &[Suggestion] {
        &self.pending
    }

    pub fn get(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.pending.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply a suggestion's edit and remove it from the pending set.
    ///
    /// The remaining suggestions are remapped through the resulting patch
    /// before this returns.
    ///
    /// If the anchored range no longer holds `old_text` (an earlier accept
    /// overlapped it, or the user edited inside it) or no longer addresses
    /// valid text, the suggestion resolves as [`AcceptOutcome::Stale`]: it is
    /// removed from the pending set and the document is left untouched. Stale
    /// suggestions are never retried or re-anchored.
    pub fn accept(
        &mut self,
        ctx: &SessionContext,
        doc: &mut Document,
        id: SuggestionId,
    ) -> AcceptOutcome {
        let Some(index) = self.pending.iter().position(|s| s.id == id) else {
            log::debug!("[{}] accept ignored: {id} is not pending", ctx.session_id);
            return AcceptOutcome::NotFound;
        };

        let suggestion = &self.pending[index];
        if suggestion.kind != SuggestionKind::Insert {
            let current = doc.text_between(suggestion.range.clone());
            if current.as_deref() != Some(suggestion.old_text.as_str()) {
                log::warn!(
                    "[{}] dropping stale suggestion {id}: expected {:?} at {:?}, found {:?}",
                    ctx.session_id,
                    suggestion.old_text,
                    suggestion.range,
                    current
                );
                self.pending.remove(index);
                return AcceptOutcome::Stale;
            }
        }

        let cmd = match suggestion.kind {
            SuggestionKind::Insert => Cmd::InsertText {
                at: suggestion.range.start,
                text: suggestion.new_text.clone(),
            },
            SuggestionKind::Delete => Cmd::DeleteRange {
                range: suggestion.range.clone(),
            },
            SuggestionKind::Replace => Cmd::ReplaceRange {
                range: suggestion.range.clone(),
                text: suggestion.new_text.clone(),
            },
        };

        match doc.apply(cmd) {
            Ok(patch) => {
                self.pending.remove(index);
                remap_suggestions(ctx, &mut self.pending, &patch);
                log::debug!(
                    "[{}] accepted suggestion {id} (v{})",
                    ctx.session_id,
                    patch.version
                );
                AcceptOutcome::Applied(patch)
            }
            Err(err) => {
                log::warn!("[{}] dropping unappliable suggestion {id}: {err}", ctx.session_id);
                self.pending.remove(index);
                AcceptOutcome::Stale
            }
        }
    }

    /// Remove a suggestion without touching the document
    pub fn reject(&mut self, ctx: &SessionContext, id: SuggestionId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.id != id);
        let removed = self.pending.len() != before;
        if !removed {
            log::debug!("[{}] reject ignored: {id} is not pending", ctx.session_id);
        }
        removed
    }

    /// Accept every pending suggestion, highest start offset first.
    ///
    /// Applying from the end of the document backwards means no edit shifts
    /// a range that is still waiting to be applied. Ties on start are broken
    /// by the larger end first.
    pub fn accept_all(&mut self, ctx: &SessionContext, doc: &mut Document) -> BatchOutcome {
        let mut order: Vec<(SuggestionId, usize, usize)> = self
            .pending
            .iter()
            .map(|s| (s.id, s.range.start, s.range.end))
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));

        let mut outcome = BatchOutcome::default();
        for (id, _, _) in order {
            match self.accept(ctx, doc, id) {
                AcceptOutcome::Applied(patch) => {
                    outcome.applied.push(id);
                    outcome.patches.push(patch);
                }
                // NotFound here means a previous accept invalidated it during remap
                AcceptOutcome::Stale | AcceptOutcome::NotFound => outcome.dropped.push(id),
            }
        }
        outcome
    }

    /// Discard the whole pending set. Returns how many were discarded.
    pub fn reject_all(&mut self, ctx: &SessionContext) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        log::debug!("[{}] rejected {count} suggestions", ctx.session_id);
        count
    }

    /// Discard the whole pending set on teardown or batch cancellation
    pub fn clear_all(&mut self, ctx: &SessionContext) -> usize {
        self.reject_all(ctx)
    }

    /// Carry the pending set through a mutation not made by the controller
    pub fn remap(&mut self, ctx: &SessionContext, patch: &Patch) -> Vec<SuggestionId> {
        remap_suggestions(ctx, &mut self.pending, patch)
    }
}
