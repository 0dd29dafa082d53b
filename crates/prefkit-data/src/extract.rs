use crate::dialogue::{is_well_formed, RawRecord, Turn};

/// The (prompt, chosen, rejected) turn lists a preference record resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferencePair {
    pub prompt_turns: Vec<Turn>,
    pub chosen_turns: Vec<Turn>,
    pub rejected_turns: Vec<Turn>,
}

/// Derive the preference pair from a record whose `chosen`/`rejected`
/// dialogues follow the final-turn convention.
///
/// With an explicit well-formed `prompt`, all three fields are used as-is.
/// Otherwise the prompt is every turn of `chosen` but the last, and each
/// side's compared response is its final turn alone. The fallback context
/// deliberately comes from the chosen side only; `rejected`'s context is
/// assumed identical by construction and never checked.
///
/// Callers must have validated that `chosen` and `rejected` are present.
#[must_use]
pub fn extract_preference_pair(record: &RawRecord) -> PreferencePair {
    let chosen = record.chosen.as_deref().unwrap_or_default();
    let rejected = record.rejected.as_deref().unwrap_or_default();

    if let Some(prompt) = record.prompt.as_deref().filter(|p| is_well_formed(p)) {
        return PreferencePair {
            prompt_turns: prompt.to_vec(),
            chosen_turns: chosen.to_vec(),
            rejected_turns: rejected.to_vec(),
        };
    }

    let split = chosen.len().saturating_sub(1);
    PreferencePair {
        prompt_turns: chosen[..split].to_vec(),
        chosen_turns: chosen[split..].to_vec(),
        rejected_turns: rejected[rejected.len().saturating_sub(1)..].to_vec(),
    }
}
