use std::ops::Range;

use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::{Document, EditError};

/// Commands that can be applied to the document
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText { at: usize, text: String },
    DeleteRange { range: Range<usize> },
    ReplaceRange { range: Range<usize>, text: String },
}

impl Cmd {
    /// First document offset touched by this command
    pub fn start(&self) -> usize {
        match self {
            Cmd::InsertText { at, .. } => *at,
            Cmd::DeleteRange { range } | Cmd::ReplaceRange { range, .. } => range.start,
        }
    }
}

/// Reject commands whose offsets do not address valid text
pub(crate) fn validate_command(doc: &Document, cmd: &Cmd) -> Result<(), EditError> {
    match cmd {
        Cmd::InsertText { at, .. } => doc.check_offset(*at),
        Cmd::DeleteRange { range } | Cmd::ReplaceRange { range, .. } => doc.check_range(range),
    }
}

/// Compile a command into a delta
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Delta<RopeInfo> {
    let mut builder = Builder::new(doc.len());
    match cmd {
        Cmd::InsertText { at, text } => {
            builder.replace(*at..*at, Rope::from(text.as_str()));
        }
        Cmd::DeleteRange { range } => {
            builder.delete(range.clone());
        }
        Cmd::ReplaceRange { range, text } => {
            builder.replace(range.clone(), Rope::from(text.as_str()));
        }
    }
    builder.build()
}
