use crate::editing::Patch;
use crate::suggest::{SessionContext, Suggestion, SuggestionId};

/// Carry every pending suggestion's range through one document mutation.
///
/// Start and end are mapped independently with the biases from the session
/// context; zero-width suggestions use the point bias for both ends so they
/// cannot be split. A suggestion is invalidated and removed when its mapped
/// range is inverted, or when a span that had content collapses to nothing
/// (the edit consumed its target). Returns the ids that were removed.
pub fn remap_suggestions(
    ctx: &SessionContext,
    pending: &mut Vec<Suggestion>,
    patch: &Patch,
) -> Vec<SuggestionId> {
    let mut invalidated = Vec::new();

    pending.retain_mut(|suggestion| {
        let mapped = if suggestion.is_point() {
            patch.map_range(&suggestion.range, ctx.remap.point_bias, ctx.remap.point_bias)
        } else {
            patch.map_range(&suggestion.range, ctx.remap.start_bias, ctx.remap.end_bias)
        };

        let consumed = !suggestion.is_point() && mapped.start >= mapped.end;
        if mapped.start > mapped.end || consumed {
            log::debug!(
                "[{}] suggestion {} invalidated by edit (v{}): {:?} -> {:?}",
                ctx.session_id,
                suggestion.id,
                patch.version,
                suggestion.range,
                mapped
            );
            invalidated.push(suggestion.id);
            return false;
        }

        suggestion.range = mapped;
        true
    });

    invalidated
}
