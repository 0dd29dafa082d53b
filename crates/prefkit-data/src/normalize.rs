use crate::dialogue::{Role, Turn};

/// Ensure the dialogue opens with a system turn.
///
/// When `enabled` and the first turn is not a system turn, an empty one is
/// prepended. Existing system turns are never removed or edited, so the
/// operation is idempotent. Disabled, it leaves the turns untouched.
pub fn ensure_system(turns: &mut Vec<Turn>, enabled: bool) {
    if !enabled {
        return;
    }
    if turns.first().map_or(true, |t| t.role != Role::System) {
        turns.insert(0, Turn::system(""));
    }
}
