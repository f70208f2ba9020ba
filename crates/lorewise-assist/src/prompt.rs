use lorewise_engine::source::ProposalRequest;

/// Instructions describing the edit contract the reply must follow
pub const SYSTEM_PROMPT: &str = r#"You are an editor helping an author revise fiction. You never rewrite the text yourself; you propose small, independent edits that the author accepts or rejects one at a time.

Reply with a single JSON object and nothing else:

{
  "summary": "one sentence describing the changes",
  "edits": [
    {"type": "replace", "oldText": "exact text to change", "newText": "replacement", "rationale": "why"},
    {"type": "delete", "oldText": "exact text to remove", "rationale": "why"},
    {"type": "insert", "newText": "text to add", "offset": 42, "rationale": "why"}
  ]
}

Rules:
- "oldText" must be copied verbatim from the passage, including punctuation and spacing.
- Keep each "oldText" short but long enough to be unique in the passage.
- "offset" is the byte position in the passage where an insert goes. Omit it to append to the end.
- Edits must not overlap.
- Stay consistent with the reference material. Do not contradict established facts.
- If no changes are needed, return an empty "edits" array.
- If you cannot do the task, return {"success": false, "error": "reason"}."#;

/// Build the user message: reference material, then the instruction, then the passage
pub fn build_user_prompt(request: &ProposalRequest, max_reference_chars: usize) -> String {
    let mut prompt = String::new();

    let references: Vec<_> = request
        .references
        .iter()
        .filter(|r| !r.content.trim().is_empty())
        .collect();
    if !references.is_empty() {
        prompt.push_str("REFERENCE MATERIAL:\n");
        for reference in references {
            prompt.push_str(&format!(
                "\n## {}\n{}\n",
                reference.title.trim(),
                truncate_chars(reference.content.trim(), max_reference_chars)
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "INSTRUCTION:\n{}\n\nPASSAGE:\n<<<\n{}\n>>>",
        request.instruction.trim(),
        request.span_text
    ));
    prompt
}

/// Cut `s` to at most `max_chars` characters, marking the cut with "..."
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let prefix: String = s.chars().take(max_chars).collect();
    format!("{prefix}...")
}
