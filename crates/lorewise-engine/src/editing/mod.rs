/*!
 * # Editing Core Module
 *
 * The document model that suggestions are anchored to.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: xi-rope Buffer
 * - The entire manuscript is stored in a single **`xi_rope::Rope`** buffer
 * - Positions are UTF-8 byte offsets; every offset handed in is checked for
 *   bounds and code point boundaries instead of panicking inside the rope
 *
 * ### 2. Command-Based Editing
 * - All edits are represented as **Commands** (`Cmd` enum) that compile to **Deltas**
 * - User typing and accepted suggestions go through the same path
 *
 * ### 3. Position Mapping
 * - Every applied command yields a **`Patch`** that keeps its delta
 * - `Patch::map_position` carries an old offset into the new document using
 *   xi-rope's `Transformer`, with an explicit `Bias` for insertions exactly at
 *   the offset
 *
 * ## Module Structure
 *
 * - **`document`**: Core `Document` type with the rope buffer and selection
 * - **`commands`**: `Cmd` enum, validation and delta compilation
 * - **`patch`**: Edit result with changed ranges and position mapping
 */

pub mod commands;
pub mod document;
pub mod patch;

pub use commands::Cmd;
pub use document::Document;
pub use patch::{Bias, Patch};

/// Errors raised when a command does not address valid text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("offset {offset} is past the end of the document (length {len})")]
    OutOfBounds { offset: usize, len: usize },
    #[error("offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
    #[error("range {start}..{end} is inverted")]
    InvertedRange { start: usize, end: usize },
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}
