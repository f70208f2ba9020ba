pub mod editing;
pub mod session;
pub mod source;
pub mod suggest;

// Re-export key types for easier usage
pub use editing::{Bias, Cmd, Document, EditError, Patch};
pub use session::{EditorSession, InstallReport, RequestScope, SessionError, SuggestionRequest};
pub use source::{
    EditProposal, ProposalRequest, RawEdit, ReferenceMaterial, SourceError, SuggestionSource,
};
pub use suggest::{
    AcceptOutcome, BatchOutcome, DecorationSet, SessionContext, Suggestion, SuggestionController,
    SuggestionId, SuggestionKind,
};
