//! Replica-side convergence state machine.
//!
//! Each call to [`ConvergenceEngine::advance`] performs exactly one
//! transition of a group's [`ReplicaSyncState`] and records a human-readable
//! description of it. The engine keeps no state of its own: everything
//! needed to resume lives in the record the caller persists.

mod diff;

pub use diff::{HostDiff, diff_hosts};

use crate::capability::StorageEngine;
use crate::client::VersionSource;
use crate::error::{CapabilityError, ControllerError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wrh_models::{ConfigVersion, ReplicaSyncState, ShardHost, SyncStep};

pub struct ConvergenceEngine {
    storage: Arc<dyn StorageEngine>,
}

impl ConvergenceEngine {
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self { storage }
    }

    /// Advance `state` by one step and return the resulting state.
    pub async fn advance(
        &self,
        state: ReplicaSyncState,
        source: &dyn VersionSource,
    ) -> ReplicaSyncState {
        let from = state.current_step;
        let next = match from {
            SyncStep::Uninitialized => initialize(state),
            SyncStep::Fetching => fetch(state, source).await,
            SyncStep::Diffing => self.compute_diff(state).await,
            SyncStep::ApplyingRemovals => self.apply_removal(state).await,
            SyncStep::ApplyingAdditions => self.apply_addition(state).await,
            SyncStep::Verifying => self.verify(state).await,
            SyncStep::Converged => self.recheck(state, source).await,
            SyncStep::Failed => retry(state),
        };
        if next.current_step != from {
            info!(
                group = %next.group,
                from = %from,
                to = %next.current_step,
                "{}",
                next.step_description
            );
        } else {
            debug!(group = %next.group, step = %from, "{}", next.step_description);
        }
        next
    }

    async fn apply_removal(&self, mut state: ReplicaSyncState) -> ReplicaSyncState {
        let Some(host) = state.pending_removals.first().cloned() else {
            return after_removals(state);
        };
        if let Err(e) = self.storage.drop_subscription(&state.group, &host).await {
            return capability_failure(state, format!("remove host {host}"), e);
        }
        // no longer serving once the subscription is gone
        state.installed_host_set.remove(&host);
        if let Err(e) = self.storage.drop_remote_source(&state.group, &host).await {
            return capability_failure(state, format!("remove host {host}"), e);
        }
        state.pending_removals.remove(0);
        let remaining = state.pending_removals.len();
        if remaining > 0 {
            return transition(
                state,
                SyncStep::ApplyingRemovals,
                format!("removed host {host} ({remaining} removals remaining)"),
            );
        }
        let mut state = after_removals(state);
        state.step_description =
            format!("removed host {host}; {}", state.step_description);
        state
    }

    async fn apply_addition(&self, mut state: ReplicaSyncState) -> ReplicaSyncState {
        let Some(host) = state.pending_additions.first().cloned() else {
            return transition(
                state,
                SyncStep::Verifying,
                "no hosts to add; verifying".into(),
            );
        };
        if let Err(e) = self.establish(&state.group, &host).await {
            return capability_failure(state, format!("add host {host}"), e);
        }
        state.pending_additions.remove(0);
        state.installed_host_set.insert(host.clone());
        let remaining = state.pending_additions.len();
        if remaining > 0 {
            transition(
                state,
                SyncStep::ApplyingAdditions,
                format!("added host {host} ({remaining} additions remaining)"),
            )
        } else {
            transition(
                state,
                SyncStep::Verifying,
                format!("added host {host}; verifying"),
            )
        }
    }

    async fn establish(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> Result<(), CapabilityError> {
        self.storage.create_remote_source(group, host).await?;
        let Err(e) = self.storage.create_subscription(group, host).await else {
            return Ok(());
        };
        if !e.retryable {
            if let Err(drop_err) = self.storage.drop_remote_source(group, host).await {
                warn!(group, host = %host, "cannot drop half-built remote source: {}", drop_err);
            }
        }
        Err(e)
    }

    /// Diff the target against the connections the storage engine holds.
    async fn compute_diff(&self, mut state: ReplicaSyncState) -> ReplicaSyncState {
        let Some(target) = state.fetched.clone() else {
            return transition(
                state,
                SyncStep::Fetching,
                "no target version recorded; fetching".into(),
            );
        };
        let established = match self.storage.established_hosts(&state.group).await {
            Ok(hosts) => hosts,
            Err(e) => {
                return capability_failure(state, "list established hosts".into(), e);
            }
        };
        state.installed_host_set = established
            .iter()
            .filter(|(_, subscribed)| **subscribed)
            .map(|(h, _)| h.clone())
            .collect();
        let diff = diff_hosts(&established, &target.hosts);
        let description = format!(
            "version {}: {} hosts to remove, {} hosts to add",
            target.id,
            diff.to_remove.len(),
            diff.to_add.len()
        );
        let next = if diff.is_empty() {
            SyncStep::Verifying
        } else if !diff.to_remove.is_empty() {
            SyncStep::ApplyingRemovals
        } else {
            SyncStep::ApplyingAdditions
        };
        state.pending_removals = diff.to_remove;
        state.pending_additions = diff.to_add;
        transition(state, next, description)
    }

    /// From `CONVERGED`, re-validate against the master and the storage
    /// engine. Nothing changes while the same version is current and its
    /// view is intact.
    async fn recheck(
        &self,
        state: ReplicaSyncState,
        source: &dyn VersionSource,
    ) -> ReplicaSyncState {
        match source.fetch_current_version(&state.group).await {
            Ok(version) if Some(version.id) == state.target_version_id => {}
            Ok(version) => return record_fetched(state, version),
            Err(e) => debug!(group = %state.group, error = %e, "recheck skipped"),
        }
        let Some(target) = state.fetched.as_ref() else {
            return transition(
                state,
                SyncStep::Fetching,
                "no target version recorded; fetching".into(),
            );
        };
        let id = target.id;
        let intact = match self
            .storage
            .verify_group_view(&state.group, id, &target.hosts)
            .await
        {
            Ok(intact) => intact,
            Err(e) => {
                warn!(group = %state.group, "cannot verify installed view: {}", e);
                false
            }
        };
        if intact {
            return state;
        }
        warn!(group = %state.group, version = id, "installed view lost");
        transition(
            state,
            SyncStep::Diffing,
            format!("installed view of version {id} is missing; re-establishing"),
        )
    }

    async fn verify(&self, state: ReplicaSyncState) -> ReplicaSyncState {
        let Some(target) = state.fetched.clone() else {
            return transition(
                state,
                SyncStep::Fetching,
                "no target version recorded; fetching".into(),
            );
        };
        if state.installed_host_set != target.hosts {
            return transition(
                state,
                SyncStep::Diffing,
                format!(
                    "installed hosts diverge from version {}; recomputing diff",
                    target.id
                ),
            );
        }
        if let Err(e) = self
            .storage
            .install_group_view(&state.group, target.id, &target.hosts)
            .await
        {
            return capability_failure(
                state,
                format!("install view of version {}", target.id),
                e,
            );
        }
        match self
            .storage
            .verify_group_view(&state.group, target.id, &target.hosts)
            .await
        {
            Ok(true) => {
                let mut state = transition(
                    state,
                    SyncStep::Converged,
                    converged_description(&target),
                );
                state.target_version_id = Some(target.id);
                state.last_error = None;
                state
            }
            Ok(false) => fail(
                state,
                format!(
                    "installed view does not match version {} after swap",
                    target.id
                ),
            ),
            Err(e) => capability_failure(
                state,
                format!("verify view of version {}", target.id),
                e,
            ),
        }
    }
}

fn transition(
    mut state: ReplicaSyncState,
    step: SyncStep,
    description: String,
) -> ReplicaSyncState {
    state.current_step = step;
    state.step_description = description;
    state.updated_at = Utc::now();
    state
}

fn fail(mut state: ReplicaSyncState, message: String) -> ReplicaSyncState {
    state.last_error = Some(message.clone());
    transition(state, SyncStep::Failed, message)
}

/// Retryable capability errors keep the current step; the description and
/// `last_error` carry the reason until the next attempt.
fn capability_failure(
    mut state: ReplicaSyncState,
    action: String,
    error: CapabilityError,
) -> ReplicaSyncState {
    let message = format!("failed to {action}: {error}");
    if !error.retryable {
        warn!(group = %state.group, "{}", message);
        return fail(state, message);
    }
    warn!(group = %state.group, "{}; will retry", message);
    state.last_error = Some(message.clone());
    let step = state.current_step;
    transition(state, step, format!("{message}; will retry"))
}

fn converged_description(target: &ConfigVersion) -> String {
    format!(
        "converged to version {} with {} hosts",
        target.id,
        target.hosts.len()
    )
}

fn initialize(state: ReplicaSyncState) -> ReplicaSyncState {
    let description = format!("initialized; fetching current version of {}", state.group);
    transition(state, SyncStep::Fetching, description)
}

fn retry(state: ReplicaSyncState) -> ReplicaSyncState {
    let reason = state.last_error.clone().unwrap_or_else(|| "unknown error".into());
    transition(
        state,
        SyncStep::Fetching,
        format!("retrying after failure ({reason}); fetching"),
    )
}

fn record_fetched(mut state: ReplicaSyncState, version: ConfigVersion) -> ReplicaSyncState {
    let description =
        format!("fetched version {} with {} hosts", version.id, version.hosts.len());
    state.latest_known_version_id = Some(version.id);
    state.fetched = Some(version);
    state.pending_removals.clear();
    state.pending_additions.clear();
    state.last_error = None;
    transition(state, SyncStep::Diffing, description)
}

async fn fetch(
    mut state: ReplicaSyncState,
    source: &dyn VersionSource,
) -> ReplicaSyncState {
    match source.fetch_current_version(&state.group).await {
        Ok(version) => record_fetched(state, version),
        Err(ControllerError::NotFound(_)) => {
            state.last_error = None;
            transition(
                state,
                SyncStep::Fetching,
                "waiting for first published version".into(),
            )
        }
        Err(e) => {
            warn!(group = %state.group, error = %e, "fetch failed; will retry");
            let message = format!("failed to fetch current version: {e}");
            state.last_error = Some(message.clone());
            transition(state, SyncStep::Fetching, format!("{message}; will retry"))
        }
    }
}

fn after_removals(state: ReplicaSyncState) -> ReplicaSyncState {
    if state.pending_additions.is_empty() {
        transition(state, SyncStep::Verifying, "removals done; verifying".into())
    } else {
        let description = format!(
            "removals done; {} hosts to add",
            state.pending_additions.len()
        );
        transition(state, SyncStep::ApplyingAdditions, description)
    }
}
