//! The reconciliation core: list the policies, resolve their target chains,
//! translate the accepted set, and converge the cluster's generated objects
//! to the result.
//!
//! Every pass is a full rebuild. Nothing is patched incrementally, so a
//! redundant or duplicate trigger costs only repeated reads, recovery from
//! any failure is "run again", and the in-memory gateway-reference index can
//! never drift from the applied state by more than one pass.

mod apply;
mod build;
pub mod cluster;
mod status;


pub use self::cluster::{ClusterApi, ClusterError, KubeClusterApi};

use filter_policy_controller_core::Translator;
use filter_policy_controller_k8s_index::{GatewayRefIndex, Trigger, TriggerReceiver};
use std::sync::Arc;
use tokio::time::Duration;

/// Converges cluster state to the desired state derived from the current set
/// of policies.
///
/// `reconcile` must never run concurrently with itself; [`run`] guarantees
/// that by driving every pass from a single task. The gateway-reference
/// index is the only state shared with the event-dispatch path and is
/// replaced wholesale, never mutated in place.
pub struct Reconciler {
    api: Arc<dyn ClusterApi>,
    translator: Arc<dyn Translator>,
    gateway_refs: Arc<GatewayRefIndex>,
    control_plane_namespace: String,
}

// === impl Reconciler ===

impl Reconciler {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        translator: Arc<dyn Translator>,
        gateway_refs: Arc<GatewayRefIndex>,
        control_plane_namespace: String,
    ) -> Self {
        Self {
            api,
            translator,
            gateway_refs,
            control_plane_namespace,
        }
    }

    /// Rebuilds the full desired state and applies it to the cluster.
    ///
    /// Errors are transient cluster failures; retrying is the caller's
    /// responsibility. Validation failures and missing targets are absorbed
    /// into policy status, and a translation failure ends the pass cleanly
    /// without any cluster writes: the engine is deterministic, so retrying
    /// unchanged inputs cannot succeed.
    pub async fn reconcile(&self) -> Result<(), ClusterError> {
        tracing::info!("reconcile");

        let policies = self.api.list_policies().await?;
        let outcome = self.build_translation_state(&policies).await?;
        // The index is replaced only once the whole build pass has succeeded;
        // after a failure the previous mapping stays in place, which can only
        // delay a trigger, never misapply state.
        self.gateway_refs.replace(outcome.gateway_refs);

        let final_state = match self.translator.process(outcome.state) {
            Ok(state) => state,
            Err(error) => {
                tracing::error!(%error, "failed to process translation state");
                return Ok(());
            }
        };

        self.apply(final_state).await?;
        self.update_policies(&policies, outcome.statuses).await
    }
}

/// Drives [`Reconciler::reconcile`] one pass at a time from coalesced
/// triggers plus a periodic resync.
///
/// The resync doubles as the retry mechanism after a failed pass; the core
/// itself never retries or backs off.
pub async fn run(reconciler: Arc<Reconciler>, mut triggers: TriggerReceiver, period: Duration) {
    let mut resync = tokio::time::interval(period);
    resync.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = resync.tick() => {}
            trigger = triggers.recv() => match trigger {
                Some(Trigger { kind, id }) => {
                    tracing::debug!(kind, %id, "reconciliation requested");
                    // Collapse any backlog; the next pass covers them all.
                    while triggers.try_recv().is_ok() {}
                }
                None => return,
            },
        }

        if let Err(error) = reconciler.reconcile().await {
            tracing::warn!(%error, "reconciliation failed; retrying on the next trigger or resync");
        }
    }
}
