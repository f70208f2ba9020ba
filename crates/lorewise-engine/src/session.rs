//! One editor instance: the document, its pending suggestions and the overlay.
//!
//! [`EditorSession`] is the single dispatch point for the suggestion
//! pipeline. Every mutation, whether typed by the user or produced by an
//! accept, runs in the same order: apply to the document, remap the pending
//! set through the patch, then recompute decorations. Nothing redraws
//! before the remap has happened.

use std::collections::VecDeque;

use crate::editing::{Cmd, Document, EditError, Patch};
use crate::source::{
    EditProposal, ProposalRequest, ReferenceMaterial, SourceError, SuggestionSource,
};
use crate::suggest::{
    AcceptOutcome, AnchorFailure, BatchOutcome, DecorationSet, DroppedEdit, SessionContext,
    Suggestion, SuggestionController, SuggestionId, SuggestionKind, assign_ranges, project,
    remap_suggestions, render_markup,
};

/// Which text is sent to the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    Document,
    Selection,
}

/// A request captured from the document at the moment it was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    /// Increases with every request; only the latest may install
    pub generation: u64,
    /// Document version the span was read at
    pub version: u64,
    /// Absolute offset of the span in the document
    pub span_offset: usize,
    pub proposal: ProposalRequest,
}

/// What happened when a response was installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: usize,
    pub dropped: Vec<DroppedEdit>,
    pub summary: String,
}

impl InstallReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("request {generation} was superseded by request {latest}")]
    Superseded { generation: u64, latest: u64 },
    #[error("selection is empty")]
    EmptySelection,
}

pub struct EditorSession {
    document: Document,
    ctx: SessionContext,
    controller: SuggestionController,
    decorations: DecorationSet,
    /// Recent patches, oldest first, for rebasing in-flight requests
    history: VecDeque<Patch>,
    generation: u64,
}

impl EditorSession {
    pub fn new(document: Document, ctx: SessionContext) -> Self {
        let decorations = project(&ctx, &document, &[]);
        log::debug!("[{}] editor session opened", ctx.session_id);
        Self {
            document,
            ctx,
            controller: SuggestionController::new(),
            decorations,
            history: VecDeque::new(),
            generation: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Snapshot of the pending set for list views and counters
    pub fn pending(&self) -> &[Suggestion] {
        self.controller.pending()
    }

    pub fn decorations(&self) -> &DecorationSet {
        &self.decorations
    }

    /// Preview of the document with pending suggestions marked inline
    pub fn render_markup(&self) -> String {
        render_markup(&self.decorations.segments(&self.document))
    }

    pub fn set_selection(&mut self, selection: std::ops::Range<usize>) {
        self.document.set_selection(selection);
    }

    /// Apply a user edit: mutation, then remap, then redraw
    pub fn edit(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        let patch = self.document.apply(cmd)?;
        let invalidated = self.controller.remap(&self.ctx, &patch);
        if !invalidated.is_empty() {
            log::debug!(
                "[{}] edit v{} invalidated {} suggestions",
                self.ctx.session_id,
                patch.version,
                invalidated.len()
            );
        }
        self.record(patch.clone());
        self.redraw();
        Ok(patch)
    }

    /// Replace the pending set with an already-anchored batch
    pub fn set_suggestions(&mut self, batch: Vec<Suggestion>) -> usize {
        let count = self.controller.set_suggestions(&self.ctx, batch);
        self.redraw();
        count
    }

    pub fn accept(&mut self, id: SuggestionId) -> AcceptOutcome {
        let outcome = self.controller.accept(&self.ctx, &mut self.document, id);
        match &outcome {
            AcceptOutcome::Applied(patch) => {
                self.record(patch.clone());
                self.redraw();
            }
            AcceptOutcome::Stale => self.redraw(),
            AcceptOutcome::NotFound => {}
        }
        outcome
    }

    pub fn reject(&mut self, id: SuggestionId) -> bool {
        let removed = self.controller.reject(&self.ctx, id);
        if removed {
            self.redraw();
        }
        removed
    }

    pub fn accept_all(&mut self) -> BatchOutcome {
        let outcome = self.controller.accept_all(&self.ctx, &mut self.document);
        for patch in &outcome.patches {
            self.record(patch.clone());
        }
        self.redraw();
        outcome
    }

    pub fn reject_all(&mut self) -> usize {
        let count = self.controller.reject_all(&self.ctx);
        self.redraw();
        count
    }

    pub fn clear_all(&mut self) -> usize {
        let count = self.controller.clear_all(&self.ctx);
        self.redraw();
        count
    }

    /// Capture the reference span for a new assistant request.
    ///
    /// Issuing a request supersedes any earlier request that has not
    /// installed yet. The current pending set stays visible until the new
    /// response lands.
    pub fn begin_request(
        &mut self,
        instruction: impl Into<String>,
        scope: RequestScope,
        references: Vec<ReferenceMaterial>,
    ) -> Result<SuggestionRequest, SessionError> {
        let span = match scope {
            RequestScope::Document => 0..self.document.len(),
            RequestScope::Selection => {
                let selection = self.document.selection();
                if selection.is_empty() {
                    return Err(SessionError::EmptySelection);
                }
                selection
            }
        };
        let span_text = self
            .document
            .text_between(span.clone())
            .ok_or(EditError::OutOfBounds {
                offset: span.end,
                len: self.document.len(),
            })?
            .into_owned();

        self.generation += 1;
        Ok(SuggestionRequest {
            generation: self.generation,
            version: self.document.version(),
            span_offset: span.start,
            proposal: ProposalRequest {
                span_text,
                instruction: instruction.into(),
                references,
            },
        })
    }

    /// Install the response to a request.
    ///
    /// A failed or superseded response leaves the pending set untouched. A
    /// successful one is anchored against the request's span, rebased
    /// through any edits made while it was in flight, and replaces the
    /// pending set atomically.
    pub fn install_response(
        &mut self,
        request: &SuggestionRequest,
        response: Result<EditProposal, SourceError>,
    ) -> Result<InstallReport, SessionError> {
        if request.generation != self.generation {
            log::debug!(
                "[{}] discarding response to superseded request {}",
                self.ctx.session_id,
                request.generation
            );
            return Err(SessionError::Superseded {
                generation: request.generation,
                latest: self.generation,
            });
        }

        let proposal = response.and_then(EditProposal::into_result).map_err(|err| {
            log::warn!("[{}] suggestion request failed: {err}", self.ctx.session_id);
            err
        })?;

        let assignment = assign_ranges(
            &self.ctx,
            &request.proposal.span_text,
            request.span_offset,
            &proposal.edits,
        );
        let mut dropped = assignment.dropped;
        let suggestions = if request.version == self.document.version() {
            assignment.suggestions
        } else {
            let (kept, lost) = self.rebase(request.version, assignment.suggestions);
            dropped.extend(lost.into_iter().map(|position| DroppedEdit {
                index: assignment.batch_index[position],
                reason: AnchorFailure::EditedInFlight,
            }));
            kept
        };

        // Report every drop against its position in the response
        let response_indices = proposal.response_indices();
        for drop in &mut dropped {
            drop.index = response_indices[drop.index];
        }
        dropped.extend(proposal.malformed.into_iter().map(|malformed| {
            log::debug!(
                "[{}] dropping unreadable edit #{}: {}",
                self.ctx.session_id,
                malformed.index,
                malformed.reason
            );
            DroppedEdit {
                index: malformed.index,
                reason: AnchorFailure::Malformed(malformed.reason),
            }
        }));
        dropped.sort_by_key(|d| d.index);

        let installed = self.controller.set_suggestions(&self.ctx, suggestions);
        self.redraw();

        Ok(InstallReport {
            installed,
            dropped,
            summary: proposal.summary,
        })
    }

    /// Ask `source` for edits and install them.
    ///
    /// Holds the session for the duration of the call; callers that keep
    /// editing while the assistant works should use [`Self::begin_request`]
    /// and [`Self::install_response`] directly.
    pub async fn request_suggestions<S: SuggestionSource>(
        &mut self,
        source: &S,
        instruction: impl Into<String>,
        scope: RequestScope,
        references: Vec<ReferenceMaterial>,
    ) -> Result<InstallReport, SessionError> {
        let request = self.begin_request(instruction, scope, references)?;
        let response = source.propose_edits(&request.proposal).await;
        self.install_response(&request, response)
    }

    /// Close the editor, discarding anything still pending
    pub fn into_document(mut self) -> Document {
        self.controller.clear_all(&self.ctx);
        log::debug!("[{}] editor session closed", self.ctx.session_id);
        self.document
    }

    /// Map freshly anchored suggestions from `version` to the current document.
    ///
    /// Returns the surviving suggestions and the positions (within the
    /// anchored batch) of those that were lost.
    fn rebase(&self, version: u64, suggestions: Vec<Suggestion>) -> (Vec<Suggestion>, Vec<usize>) {
        let ids: Vec<SuggestionId> = suggestions.iter().map(|s| s.id).collect();
        let mut rebased = suggestions;

        let reaches_back = self
            .history
            .front()
            .is_some_and(|oldest| oldest.version <= version + 1);
        if reaches_back {
            for patch in self.history.iter().filter(|p| p.version > version) {
                remap_suggestions(&self.ctx, &mut rebased, patch);
            }
        } else {
            log::debug!(
                "[{}] edit history does not reach v{version}; verifying anchored text only",
                self.ctx.session_id
            );
            // An insertion point carries no text to verify against
            rebased.retain(|s| s.kind != SuggestionKind::Insert);
        }

        // Whatever the mapping, only keep suggestions whose target text is still there
        rebased.retain(|s| match s.kind {
            SuggestionKind::Insert => self.document.check_offset(s.range.start).is_ok(),
            _ => {
                self.document.text_between(s.range.clone()).as_deref() == Some(s.old_text.as_str())
            }
        });

        let lost = ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !rebased.iter().any(|s| s.id == **id))
            .map(|(index, _)| index)
            .collect();
        (rebased, lost)
    }

    fn record(&mut self, patch: Patch) {
        if self.ctx.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.ctx.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(patch);
    }

    fn redraw(&mut self) {
        let decorations = project(&self.ctx, &self.document, self.controller.pending());
        // Warn once per suggestion rather than on every keystroke
        for id in &decorations.skipped {
            if !self.decorations.skipped.contains(id) {
                log::warn!(
                    "[{}] suggestion {id} no longer addresses valid text; hiding it",
                    self.ctx.session_id
                );
            }
        }
        self.decorations = decorations;
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("session_id", &self.ctx.session_id)
            .field("document", &self.document)
            .field("pending", &self.controller.len())
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawEdit;
    use pretty_assertions::assert_eq;

    fn replace(old_text: &str, new_text: &str) -> RawEdit {
        RawEdit {
            kind: SuggestionKind::Replace,
            old_text: old_text.to_string(),
            new_text: new_text.to_string(),
            rationale: None,
            offset: None,
        }
    }

    fn session(text: &str) -> EditorSession {
        EditorSession::new(Document::from_text(text), SessionContext::new())
    }

    #[test]
    fn test_edit_remaps_and_redraws() {
        let mut session = session("The cat sat.");
        session.set_suggestions(vec![Suggestion::replace(4..7, "cat", "dog")]);

        session
            .edit(Cmd::InsertText {
                at: 0,
                text: "Well, ".to_string(),
            })
            .unwrap();

        assert_eq!(session.pending()[0].range, 10..13);
        assert_eq!(session.decorations().version, session.document().version());
        assert_eq!(session.render_markup(), "Well, The [-cat-]{+dog+} sat.");
    }

    #[test]
    fn test_install_anchors_against_selection() {
        let mut session = session("First line. The cat sat.");
        session.set_selection(12..24);

        let request = session
            .begin_request("tighten", RequestScope::Selection, vec![])
            .unwrap();
        let report = session
            .install_response(
                &request,
                Ok(EditProposal::new(vec![replace("cat", "dog")], "one change")),
            )
            .unwrap();

        assert_eq!(request.span_offset, 12);
        assert_eq!(request.proposal.span_text, "The cat sat.");
        assert_eq!(report.installed, 1);
        assert_eq!(report.summary, "one change");
        assert_eq!(session.pending()[0].range, 16..19);
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let mut session = session("The cat sat.");
        session.set_selection(3..3);

        let result = session.begin_request("tighten", RequestScope::Selection, vec![]);

        assert!(matches!(result, Err(SessionError::EmptySelection)));
    }

    #[test]
    fn test_response_is_rebased_through_edits_made_in_flight() {
        let mut session = session("The cat sat.");
        let request = session
            .begin_request("animals", RequestScope::Document, vec![])
            .unwrap();

        session
            .edit(Cmd::InsertText {
                at: 0,
                text: "Well, ".to_string(),
            })
            .unwrap();
        let report = session
            .install_response(&request, Ok(EditProposal::new(vec![replace("cat", "dog")], "")))
            .unwrap();

        assert_eq!(report.installed, 1);
        assert_eq!(session.pending()[0].range, 10..13);
        assert!(session.accept(session.pending()[0].id).is_applied());
        assert_eq!(session.document().text(), "Well, The dog sat.");
    }

    #[test]
    fn test_target_edited_in_flight_is_dropped() {
        let mut session = session("The cat sat. The hat fell.");
        let request = session
            .begin_request("animals", RequestScope::Document, vec![])
            .unwrap();

        session.edit(Cmd::DeleteRange { range: 4..8 }).unwrap();
        let report = session
            .install_response(
                &request,
                Ok(EditProposal::new(
                    vec![replace("cat", "dog"), replace("hat", "cap")],
                    "",
                )),
            )
            .unwrap();

        assert_eq!(report.installed, 1);
        assert_eq!(
            report.dropped,
            vec![DroppedEdit {
                index: 0,
                reason: AnchorFailure::EditedInFlight
            }]
        );
        assert_eq!(session.pending()[0].old_text, "hat");
    }

    #[test]
    fn test_without_history_only_matching_text_survives() {
        let ctx = SessionContext::new().with_history_limit(0);
        let mut session = EditorSession::new(Document::from_text("The cat sat."), ctx);
        let request = session
            .begin_request("animals", RequestScope::Document, vec![])
            .unwrap();

        session
            .edit(Cmd::InsertText {
                at: 0,
                text: "Well, ".to_string(),
            })
            .unwrap();
        let report = session
            .install_response(&request, Ok(EditProposal::new(vec![replace("cat", "dog")], "")))
            .unwrap();

        assert_eq!(report.installed, 0);
        assert_eq!(report.dropped_count(), 1);
        assert!(session.pending().is_empty());
    }

    #[test]
    fn test_superseded_response_is_discarded() {
        let mut session = session("The cat sat.");
        session.set_suggestions(vec![Suggestion::insert(12, " Then it left.")]);
        let first = session
            .begin_request("one", RequestScope::Document, vec![])
            .unwrap();
        let second = session
            .begin_request("two", RequestScope::Document, vec![])
            .unwrap();

        let result = session.install_response(
            &first,
            Ok(EditProposal::new(vec![replace("cat", "dog")], "")),
        );

        assert!(matches!(
            result,
            Err(SessionError::Superseded {
                generation: 1,
                latest: 2
            })
        ));
        assert_eq!(second.generation, 2);
        assert_eq!(session.pending().len(), 1);
        assert_eq!(session.pending()[0].new_text, " Then it left.");
    }

    #[test]
    fn test_failed_response_leaves_pending_untouched() {
        let mut session = session("The cat sat.");
        session.set_suggestions(vec![Suggestion::replace(4..7, "cat", "dog")]);
        let before = session.pending().to_vec();
        let request = session
            .begin_request("again", RequestScope::Document, vec![])
            .unwrap();

        let result = session.install_response(
            &request,
            Err(SourceError::Status {
                status: 503,
                body: "overloaded".to_string(),
            }),
        );

        assert!(matches!(result, Err(SessionError::Source(_))));
        assert_eq!(session.pending(), before.as_slice());
        assert_eq!(session.document().text(), "The cat sat.");
    }

    #[test]
    fn test_history_is_bounded() {
        let ctx = SessionContext::new().with_history_limit(2);
        let mut session = EditorSession::new(Document::from_text(""), ctx);

        for _ in 0..5 {
            session
                .edit(Cmd::InsertText {
                    at: 0,
                    text: "x".to_string(),
                })
                .unwrap();
        }

        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history.front().map(|p| p.version), Some(4));
    }

    #[test]
    fn test_insert_without_history_is_dropped() {
        let ctx = SessionContext::new().with_history_limit(0);
        let mut session = EditorSession::new(Document::from_text("Hello world"), ctx);
        let request = session
            .begin_request("warmer", RequestScope::Document, vec![])
            .unwrap();

        session
            .edit(Cmd::InsertText {
                at: 0,
                text: "Hi ".to_string(),
            })
            .unwrap();
        let insert = RawEdit {
            kind: SuggestionKind::Insert,
            old_text: String::new(),
            new_text: " there".to_string(),
            rationale: None,
            offset: Some(5),
        };
        let report = session
            .install_response(&request, Ok(EditProposal::new(vec![insert], "")))
            .unwrap();

        assert_eq!(report.installed, 0);
        assert_eq!(
            report.dropped,
            vec![DroppedEdit {
                index: 0,
                reason: AnchorFailure::EditedInFlight
            }]
        );
        assert_eq!(session.render_markup(), "Hi Hello world");
    }

    #[test]
    fn test_error_only_reply_leaves_pending_untouched() {
        let mut session = session("The cat sat.");
        session.set_suggestions(vec![Suggestion::replace(4..7, "cat", "dog")]);
        let request = session
            .begin_request("again", RequestScope::Document, vec![])
            .unwrap();
        let reply: EditProposal = serde_json::from_str(r#"{"error": "model overloaded"}"#).unwrap();

        let result = session.install_response(&request, Ok(reply));

        assert!(matches!(
            result,
            Err(SessionError::Source(SourceError::Rejected(_)))
        ));
        assert_eq!(session.pending().len(), 1);
        assert_eq!(session.pending()[0].new_text, "dog");
    }

    #[test]
    fn test_unreadable_edits_are_reported_at_their_response_position() {
        let mut session = session("The cat sat on the mat.");
        let request = session
            .begin_request("tidy", RequestScope::Document, vec![])
            .unwrap();
        let reply: EditProposal = serde_json::from_str(
            r#"{"summary": "s", "edits": [
                {"type": "insert", "newText": "!", "offset": -3},
                {"type": "replace", "oldText": "dog", "newText": "wolf"},
                {"type": "replace", "oldText": "cat", "newText": "lynx"},
                {"type": "rewrite", "oldText": "mat"}
            ]}"#,
        )
        .unwrap();

        let report = session.install_response(&request, Ok(reply)).unwrap();

        assert_eq!(report.installed, 1);
        let reasons: Vec<(usize, bool)> = report
            .dropped
            .iter()
            .map(|d| (d.index, matches!(d.reason, AnchorFailure::Malformed(_))))
            .collect();
        assert_eq!(reasons, vec![(0, true), (1, false), (3, true)]);
        assert_eq!(report.dropped[1].reason, AnchorFailure::NotFound);
        assert_eq!(session.render_markup(), "The [-cat-]{+lynx+} sat on the mat.");
    }

    #[test]
    fn test_unrenderable_suggestion_stays_pending_across_redraws() {
        // "é" spans bytes 1..3, so the range starts inside it
        let mut session = session("héllo");
        let broken = Suggestion::replace(2..4, "?", "e");
        let broken_id = broken.id;
        session.set_suggestions(vec![broken, Suggestion::insert(6, "!")]);

        for _ in 0..3 {
            session
                .edit(Cmd::InsertText {
                    at: 0,
                    text: "x".to_string(),
                })
                .unwrap();
        }

        assert_eq!(session.decorations().skipped, vec![broken_id]);
        assert_eq!(session.pending().len(), 2);
        assert_eq!(session.render_markup(), "xxxhéllo{+!+}");
    }
}
