use crate::{ClusterError, Reconciler};
use ahash::AHashMap as HashMap;
use filter_policy_controller_core::FinalState;
use filter_policy_controller_k8s_api::istio::EnvoyFilter;
use filter_policy_controller_k8s_api::{ResourceExt, CREATED_BY, LABEL_CREATED_BY};
use filter_policy_controller_k8s_index::ResourceId;

// === impl Reconciler ===

impl Reconciler {
    /// Converges the cluster's owned EnvoyFilters to the desired set:
    /// prune what is no longer desired, create what is missing, and replace
    /// only what differs in content.
    pub(crate) async fn apply(&self, final_state: FinalState) -> Result<(), ClusterError> {
        let existing = self.api.list_owned_envoy_filters().await?;

        // Anything we own that fell out of the desired set is pruned. Objects
        // without the ownership label were never listed, so they are never
        // deleted here no matter what the desired set contains.
        for filter in &existing {
            if !final_state.generated.contains_key(&filter.name_unchecked()) {
                let id = ResourceId::of(filter);
                tracing::info!(%id, "deleting EnvoyFilter");
                self.api.delete_envoy_filter(&id).await?;
            }
        }

        let existing_by_name: HashMap<String, &EnvoyFilter> = existing
            .iter()
            .map(|filter| (filter.name_unchecked(), filter))
            .collect();

        for (name, desired) in &final_state.generated {
            let mut desired = desired.clone();
            desired.metadata.namespace = Some(self.control_plane_namespace.clone());
            desired
                .metadata
                .labels
                .get_or_insert_with(Default::default)
                .insert(LABEL_CREATED_BY.to_string(), CREATED_BY.to_string());

            match existing_by_name.get(name) {
                None => {
                    let id = ResourceId::of(&desired);
                    tracing::info!(%id, "creating EnvoyFilter");
                    // If a later create fails, retrying wholesale is safe: the
                    // next pass regenerates the same set and sees this one as
                    // already equal.
                    self.api.create_envoy_filter(&desired).await?;
                }
                Some(current) => {
                    // Content equality on the payload only; cluster-assigned
                    // metadata never forces a write.
                    if current.spec == desired.spec {
                        continue;
                    }
                    let id = ResourceId::of(&desired);
                    tracing::info!(%id, "updating EnvoyFilter");
                    desired.metadata.resource_version = current.metadata.resource_version.clone();
                    self.api.replace_envoy_filter(&desired).await?;
                }
            }
        }

        Ok(())
    }
}
