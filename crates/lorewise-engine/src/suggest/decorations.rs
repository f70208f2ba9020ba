use std::collections::BTreeSet;
use std::ops::Range;

use crate::editing::Document;
use crate::suggest::{SessionContext, Suggestion, SuggestionId, SuggestionKind};

/// Visual treatment for one half of a suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationKind {
    /// Zero-width marker showing proposed text that is not in the document
    Widget { at: usize, text: String },
    /// Existing text marked for removal; content is unchanged underneath
    Strike { range: Range<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Accept/reject on either half of a replace resolves both
    pub suggestion: SuggestionId,
    pub kind: DecorationKind,
}

impl Decoration {
    pub fn position(&self) -> usize {
        match &self.kind {
            DecorationKind::Widget { at, .. } => *at,
            DecorationKind::Strike { range } => range.start,
        }
    }

    fn sort_key(&self) -> (usize, u8) {
        // Widgets render before text starting at the same offset
        let rank = match self.kind {
            DecorationKind::Widget { .. } => 0,
            DecorationKind::Strike { .. } => 1,
        };
        (self.position(), rank)
    }
}

/// Overlay derived from the pending set for one document version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    /// Sorted by position
    pub decorations: Vec<Decoration>,
    /// Pending suggestions whose range is not valid in the document; they stay
    /// pending but render nothing
    pub skipped: Vec<SuggestionId>,
    /// Document version the overlay was computed against
    pub version: u64,
}

/// Project the pending set into decorations without touching the document
pub fn project(ctx: &SessionContext, doc: &Document, pending: &[Suggestion]) -> DecorationSet {
    let mut set = DecorationSet {
        version: doc.version(),
        ..DecorationSet::default()
    };

    for suggestion in pending {
        if let Err(err) = doc.check_range(&suggestion.range) {
            log::debug!(
                "[{}] not rendering suggestion {} at {:?}: {err}",
                ctx.session_id,
                suggestion.id,
                suggestion.range
            );
            set.skipped.push(suggestion.id);
            continue;
        }

        let id = suggestion.id;
        match suggestion.kind {
            SuggestionKind::Insert => set.decorations.push(Decoration {
                suggestion: id,
                kind: DecorationKind::Widget {
                    at: suggestion.range.start,
                    text: suggestion.new_text.clone(),
                },
            }),
            SuggestionKind::Delete => set.decorations.push(Decoration {
                suggestion: id,
                kind: DecorationKind::Strike {
                    range: suggestion.range.clone(),
                },
            }),
            SuggestionKind::Replace => {
                set.decorations.push(Decoration {
                    suggestion: id,
                    kind: DecorationKind::Strike {
                        range: suggestion.range.clone(),
                    },
                });
                set.decorations.push(Decoration {
                    suggestion: id,
                    kind: DecorationKind::Widget {
                        at: suggestion.range.end,
                        text: suggestion.new_text.clone(),
                    },
                });
            }
        }
    }

    set.decorations.sort_by_key(Decoration::sort_key);
    set
}

/// A run of the rendered view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Document text; `removed_by` lists suggestions striking it through
    Text {
        range: Range<usize>,
        text: String,
        removed_by: Vec<SuggestionId>,
    },
    /// Proposed text shown inline but not part of the document
    Insertion {
        suggestion: SuggestionId,
        text: String,
    },
}

impl DecorationSet {
    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    /// Decorations belonging to one suggestion (both halves of a replace)
    pub fn for_suggestion(&self, id: SuggestionId) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter().filter(move |d| d.suggestion == id)
    }

    /// Split the document into text runs and inline insertions.
    ///
    /// Text is cut at every decoration edge so each run is either untouched
    /// or struck through by a fixed set of suggestions.
    pub fn segments(&self, doc: &Document) -> Vec<Segment> {
        let mut boundaries = BTreeSet::from([0, doc.len()]);
        for decoration in &self.decorations {
            match &decoration.kind {
                DecorationKind::Widget { at, .. } => {
                    boundaries.insert(*at);
                }
                DecorationKind::Strike { range } => {
                    boundaries.insert(range.start);
                    boundaries.insert(range.end);
                }
            }
        }
        let boundaries: Vec<usize> = boundaries.into_iter().collect();

        let mut segments = Vec::new();
        for (i, &at) in boundaries.iter().enumerate() {
            for decoration in &self.decorations {
                if let DecorationKind::Widget { at: widget_at, text } = &decoration.kind
                    && *widget_at == at
                {
                    segments.push(Segment::Insertion {
                        suggestion: decoration.suggestion,
                        text: text.clone(),
                    });
                }
            }

            let Some(&next) = boundaries.get(i + 1) else {
                break;
            };
            let range = at..next;
            let removed_by = self
                .decorations
                .iter()
                .filter_map(|decoration| match &decoration.kind {
                    DecorationKind::Strike { range: strike }
                        if strike.start <= range.start && strike.end >= range.end =>
                    {
                        Some(decoration.suggestion)
                    }
                    _ => None,
                })
                .collect();
            let text = doc
                .text_between(range.clone())
                .map(|text| text.into_owned())
                .unwrap_or_default();
            segments.push(Segment::Text {
                range,
                text,
                removed_by,
            });
        }

        segments
    }
}

/// Render segments as plain text with `[-removed-]` and `{+inserted+}` markers
pub fn render_markup(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text {
                text, removed_by, ..
            } => {
                if removed_by.is_empty() {
                    out.push_str(text);
                } else {
                    out.push_str("[-");
                    out.push_str(text);
                    out.push_str("-]");
                }
            }
            Segment::Insertion { text, .. } => {
                out.push_str("{+");
                out.push_str(text);
                out.push_str("+}");
            }
        }
    }
    out
}
