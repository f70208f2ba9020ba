//! Writing assistant backed by an OpenAI-compatible chat completions API.
//!
//! [`ChatCompletionSource`] implements the engine's
//! [`SuggestionSource`](lorewise_engine::source::SuggestionSource) contract:
//! one HTTP request per proposal, no retries, and a lenient parse of the
//! model's reply into an [`EditProposal`](lorewise_engine::source::EditProposal).

mod client;
mod parse;
mod prompt;

pub use client::{AssistError, ChatCompletionSource};
pub use parse::parse_proposal;
pub use prompt::{SYSTEM_PROMPT, build_user_prompt};
