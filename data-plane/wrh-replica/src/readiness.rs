use wrh_models::{ReplicaSyncState, SyncStep};

/// Whether a group's shard data can be served by this replica.
///
/// True only when the machine sits in `CONVERGED` on the newest version it
/// has seen from the master. Readiness can flip back to false once a newer
/// version is observed, so callers poll rather than cache the answer.
pub fn is_ready(state: &ReplicaSyncState) -> bool {
    state.current_step == SyncStep::Converged
        && state.target_version_id.is_some()
        && state.target_version_id == state.latest_known_version_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_not_ready() {
        assert!(!is_ready(&ReplicaSyncState::new("g1")));
    }

    #[test]
    fn converged_on_latest_is_ready() {
        let mut state = ReplicaSyncState::new("g1");
        state.current_step = SyncStep::Converged;
        state.target_version_id = Some(4);
        state.latest_known_version_id = Some(4);
        assert!(is_ready(&state));
    }

    #[test]
    fn newer_known_version_clears_readiness() {
        let mut state = ReplicaSyncState::new("g1");
        state.current_step = SyncStep::Diffing;
        state.target_version_id = Some(4);
        state.latest_known_version_id = Some(5);
        assert!(!is_ready(&state));

        state.current_step = SyncStep::Converged;
        assert!(!is_ready(&state));
    }
}
