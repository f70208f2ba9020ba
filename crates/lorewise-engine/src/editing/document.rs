use std::borrow::Cow;
use std::ops::Range;

use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::{Cmd, EditError, Patch};

/// Core manuscript buffer.
///
/// The whole document lives in one `xi_rope::Rope`. All positions are UTF-8
/// byte offsets into that rope, and every edit flows through [`Cmd`], which
/// compiles to an xi-rope `Delta`. The delta is kept on the returned
/// [`Patch`] so that anything holding offsets (suggestion ranges, in-flight
/// requests) can be mapped through the same edit.
///
/// ## Usage Pattern
///
/// ```rust
/// # use lorewise_engine::editing::{Cmd, Document};
/// let mut doc = Document::from_text("Hello world");
///
/// let patch = doc.apply(Cmd::InsertText { at: 0, text: "Hi ".to_string() }).unwrap();
///
/// assert_eq!(doc.text(), "Hi Hello world");
/// assert_eq!(patch.version, doc.version());
/// ```
#[derive(Clone)]
pub struct Document {
    /// Rope buffer containing the entire manuscript as UTF-8
    pub(crate) buffer: Rope,
    /// Current selection/cursor position as byte offsets in buffer
    pub(crate) selection: Range<usize>,
    /// Version counter incremented on each edit
    pub(crate) version: u64,
}

impl Document {
    /// Create a document from raw bytes, rejecting invalid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EditError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::from_text(text))
    }

    pub fn from_text(text: &str) -> Self {
        let buffer = Rope::from(text);
        let len = buffer.len();
        Self {
            buffer,
            selection: len..len, // Start with cursor at end
            version: 0,
        }
    }

    /// Get the document's content as raw bytes (exact round-trip)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    /// Apply a command to the document.
    ///
    /// The command is validated against the current buffer first; an invalid
    /// command leaves the document untouched. On success the delta is applied,
    /// the selection is carried through it, and the version is bumped.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        crate::editing::commands::validate_command(self, &cmd)?;
        let delta = self.compile_command(&cmd);

        // Track changed ranges (in new-document coordinates) for the patch
        let mut changed = Vec::new();
        let mut cursor = 0;
        for op in delta.els.iter() {
            match op {
                xi_rope::delta::DeltaElement::Copy(from, to) => {
                    cursor += to - from;
                }
                xi_rope::delta::DeltaElement::Insert(inserted) => {
                    let start = cursor;
                    let end = cursor + inserted.len();
                    changed.push(start..end);
                    cursor = end;
                }
            }
        }
        // Pure deletions insert nothing; report the collapse point instead
        if changed.is_empty() {
            let at = cmd.start();
            changed.push(at..at);
        }

        self.buffer = delta.apply(&self.buffer);
        self.version += 1;

        let mut patch = Patch {
            changed,
            new_selection: 0..0,
            version: self.version,
            delta,
        };
        patch.new_selection = patch.map_selection(&self.selection);
        self.selection = patch.new_selection.clone();

        Ok(patch)
    }

    /// Insert `text` at byte offset `at`
    pub fn insert_text(&mut self, text: &str, at: usize) -> Result<Patch, EditError> {
        self.apply(Cmd::InsertText {
            at,
            text: text.to_string(),
        })
    }

    /// Delete the half-open byte range `range`
    pub fn delete_range(&mut self, range: Range<usize>) -> Result<Patch, EditError> {
        self.apply(Cmd::DeleteRange { range })
    }

    /// Read the text covered by `range`.
    ///
    /// Returns `None` when the range is out of bounds, inverted, or splits a
    /// UTF-8 code point.
    pub fn text_between(&self, range: Range<usize>) -> Option<Cow<'_, str>> {
        self.check_range(&range).ok()?;
        Some(self.buffer.slice_to_cow(range))
    }

    /// Get the current selection range
    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Set the selection range, clamped to the document
    pub fn set_selection(&mut self, selection: Range<usize>) {
        let len = self.len();
        let start = selection.start.min(len);
        let end = selection.end.min(len).max(start);
        self.selection = start..end;
    }

    /// Get the current version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the current text content
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Length of the document in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Check whether `offset` can be used as a position in this document
    pub fn check_offset(&self, offset: usize) -> Result<(), EditError> {
        let len = self.len();
        if offset > len {
            return Err(EditError::OutOfBounds { offset, len });
        }
        if offset != 0 && offset != len && !self.buffer.is_codepoint_boundary(offset) {
            return Err(EditError::NotCharBoundary { offset });
        }
        Ok(())
    }

    /// Check whether `range` addresses valid text in this document
    pub fn check_range(&self, range: &Range<usize>) -> Result<(), EditError> {
        if range.start > range.end {
            return Err(EditError::InvertedRange {
                start: range.start,
                end: range.end,
            });
        }
        self.check_offset(range.start)?;
        self.check_offset(range.end)
    }

    pub(crate) fn compile_command(&self, cmd: &Cmd) -> Delta<RopeInfo> {
        crate::editing::commands::compile_command(self, cmd)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.len())
            .field("selection", &self.selection)
            .field("version", &self.version)
            .finish()
    }
}
