use std::ops::Range;

use serde::{Deserialize, Serialize};
use xi_rope::delta::Transformer;
use xi_rope::{Delta, RopeInfo};

/// Which side of text inserted exactly at a position the position lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    /// Stay in front of the inserted text
    Before,
    /// Move past the inserted text
    After,
}

impl Bias {
    fn is_after(self) -> bool {
        matches!(self, Bias::After)
    }
}

/// Result of applying a command
#[derive(Clone)]
pub struct Patch {
    /// Byte ranges in the new document that received inserted text
    pub changed: Vec<Range<usize>>,
    pub new_selection: Range<usize>,
    pub version: u64,
    pub(crate) delta: Delta<RopeInfo>,
}

impl Patch {
    /// Map an offset in the pre-edit document to the post-edit document
    pub fn map_position(&self, pos: usize, bias: Bias) -> usize {
        Transformer::new(&self.delta).transform(pos, bias.is_after())
    }

    /// Map both ends of a range independently.
    ///
    /// The result may be inverted (`start > end`) when the biases pull the
    /// ends past each other; callers decide what that means for them.
    pub fn map_range(&self, range: &Range<usize>, start_bias: Bias, end_bias: Bias) -> Range<usize> {
        let mut transformer = Transformer::new(&self.delta);
        let start = transformer.transform(range.start, start_bias.is_after());
        let end = transformer.transform(range.end, end_bias.is_after());
        start..end
    }

    /// Document length before the edit
    pub fn base_len(&self) -> usize {
        self.delta.base_len
    }

    pub(crate) fn map_selection(&self, selection: &Range<usize>) -> Range<usize> {
        if selection.is_empty() {
            // A caret follows text typed at it
            let at = self.map_position(selection.start, Bias::After);
            return at..at;
        }
        let mapped = self.map_range(selection, Bias::After, Bias::Before);
        if mapped.start > mapped.end {
            mapped.start..mapped.start
        } else {
            mapped
        }
    }
}

impl std::fmt::Debug for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patch")
            .field("changed", &self.changed)
            .field("new_selection", &self.new_selection)
            .field("version", &self.version)
            .field("base_len", &self.delta.base_len)
            .finish()
    }
}
