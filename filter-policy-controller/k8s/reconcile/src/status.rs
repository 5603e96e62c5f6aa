use crate::build::PolicyOutcome;
use crate::{ClusterError, Reconciler};
use ahash::AHashMap as HashMap;
use filter_policy_controller_k8s_api::policy::{
    HTTPFilterPolicy, HTTPFilterPolicyStatus, CONDITION_ACCEPTED,
};
use filter_policy_controller_k8s_api::{Condition, Time};
use filter_policy_controller_k8s_index::ResourceId;

pub(crate) fn make_condition(outcome: &PolicyOutcome) -> Condition {
    #[cfg(not(test))]
    let timestamp = chrono::Utc::now();
    #[cfg(test)]
    let timestamp = chrono::DateTime::<chrono::Utc>::MIN_UTC;

    Condition {
        last_transition_time: Time(timestamp),
        message: outcome.message.clone(),
        observed_generation: outcome.observed_generation,
        reason: outcome.reason.as_str().to_string(),
        status: if outcome.reason.is_accepted() {
            "True"
        } else {
            "False"
        }
        .to_string(),
        type_: CONDITION_ACCEPTED.to_string(),
    }
}

/// Whether the desired condition differs from the recorded one in anything
/// but the transition timestamp.
fn condition_changed(existing: Option<&Condition>, desired: &Condition) -> bool {
    match existing {
        Some(existing) => {
            existing.status != desired.status
                || existing.reason != desired.reason
                || existing.message != desired.message
                || existing.observed_generation != desired.observed_generation
        }
        None => true,
    }
}

// === impl Reconciler ===

impl Reconciler {
    /// Persists exactly the statuses that changed, comparing each computed
    /// outcome against the status snapshot read at the start of the pass.
    pub(crate) async fn update_policies(
        &self,
        policies: &[HTTPFilterPolicy],
        outcomes: Vec<PolicyOutcome>,
    ) -> Result<(), ClusterError> {
        let by_id: HashMap<ResourceId, &HTTPFilterPolicy> = policies
            .iter()
            .map(|policy| (ResourceId::of(policy), policy))
            .collect();

        for outcome in outcomes {
            let desired = make_condition(&outcome);
            let existing = by_id
                .get(&outcome.id)
                .and_then(|policy| policy.accepted_condition());
            if !condition_changed(existing, &desired) {
                continue;
            }

            tracing::info!(id = %outcome.id, reason = %outcome.reason, "updating HTTPFilterPolicy status");
            let status = HTTPFilterPolicyStatus {
                conditions: vec![desired],
            };
            self.api.patch_policy_status(&outcome.id, &status).await?;
        }
        Ok(())
    }
}
