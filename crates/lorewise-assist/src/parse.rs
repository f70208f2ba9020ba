use lorewise_engine::source::{EditProposal, SourceError};

/// Maximum length of response content quoted in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Parse a model reply into a proposal.
///
/// Accepts bare JSON, JSON wrapped in a markdown fence, or prose with a JSON
/// object embedded in it. The first candidate that deserializes wins.
pub fn parse_proposal(content: &str) -> Result<EditProposal, SourceError> {
    let mut candidates = Vec::new();
    push_unique_candidate(&mut candidates, content);
    if let Some(stripped) = strip_markdown_fences(content) {
        push_unique_candidate(&mut candidates, stripped);
    }

    let mut idx = 0;
    while idx < candidates.len() {
        let current = candidates[idx].clone();
        for extracted in extract_json_objects(&current, 4) {
            push_unique_candidate(&mut candidates, extracted);
        }
        idx += 1;
    }

    let mut last_err: Option<String> = None;
    for candidate in candidates {
        let value = match serde_json::from_str::<serde_json::Value>(&candidate) {
            Ok(value) => value,
            Err(err) => {
                last_err = Some(err.to_string());
                continue;
            }
        };
        // A lone edit object embedded in the reply is not a proposal
        if !looks_like_proposal(&value) {
            last_err = Some("JSON has no edits, success or error field".to_string());
            continue;
        }
        match serde_json::from_value::<EditProposal>(value) {
            Ok(proposal) => {
                if !proposal.malformed.is_empty() {
                    log::debug!(
                        "{} of {} edits in reply could not be read",
                        proposal.malformed.len(),
                        proposal.malformed.len() + proposal.edits.len()
                    );
                }
                return Ok(proposal);
            }
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    Err(SourceError::Parse(format!(
        "{} (content: {})",
        last_err.unwrap_or_else(|| "empty response".to_string()),
        sanitize_content(content)
    )))
}

fn looks_like_proposal(value: &serde_json::Value) -> bool {
    value.as_object().is_some_and(|object| {
        ["edits", "success", "error"]
            .iter()
            .any(|key| object.contains_key(*key))
    })
}

/// Shorten response content for error messages, hiding anything that looks
/// like it might carry credentials
pub(crate) fn sanitize_content(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-",
    ];

    let truncated: String = content.chars().take(MAX_ERROR_CONTENT_LEN).collect();
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated
}

fn push_unique_candidate(candidates: &mut Vec<String>, candidate: impl Into<String>) {
    let candidate = candidate.into();
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return;
    }
    if !candidates.iter().any(|existing| existing == trimmed) {
        candidates.push(trimmed.to_string());
    }
}

fn strip_markdown_fences(content: &str) -> Option<String> {
    let without_open = content.trim().strip_prefix("```")?;
    // Skip the info string ("json") on the opening line
    let body = match without_open.find('\n') {
        Some(newline) => &without_open[newline + 1..],
        None => without_open,
    };
    let end = body.rfind("```")?;
    Some(body[..end].trim().to_string())
}

/// Up to `max` balanced `{...}` objects, in order of their opening brace
fn extract_json_objects(content: &str, max: usize) -> Vec<String> {
    let mut out = Vec::new();
    for (idx, ch) in content.char_indices() {
        if out.len() >= max {
            break;
        }
        if ch == '{'
            && let Some(object) = balanced_from(content, idx)
        {
            push_unique_candidate(&mut out, object);
        }
    }
    out
}

fn balanced_from(content: &str, start: usize) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(content[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
