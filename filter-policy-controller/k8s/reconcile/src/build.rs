use crate::{ClusterError, Reconciler};
use ahash::AHashMap as HashMap;
use filter_policy_controller_core::InitState;
use filter_policy_controller_k8s_api::istio::MESH_GATEWAY;
use filter_policy_controller_k8s_api::policy::{
    AcceptedReason, HTTPFilterPolicy, TARGET_GROUP_ISTIO, TARGET_KIND_VIRTUAL_SERVICE,
};
use filter_policy_controller_k8s_api::{
    validate_gateway, validate_http_filter_policy, validate_virtual_service,
};
use filter_policy_controller_k8s_index::ResourceId;

/// Everything a build pass over the full policy list produces.
pub(crate) struct TranslationOutcome {
    pub state: InitState,
    pub statuses: Vec<PolicyOutcome>,
    pub gateway_refs: HashMap<ResourceId, Vec<ResourceId>>,
}

/// The acceptance outcome computed for one policy this pass. Policies whose
/// previous outcome was kept (unchanged invalid specs) get no entry and thus
/// no status write.
pub(crate) struct PolicyOutcome {
    pub id: ResourceId,
    pub observed_generation: Option<i64>,
    pub reason: AcceptedReason,
    pub message: String,
}

impl PolicyOutcome {
    fn new(
        id: ResourceId,
        observed_generation: Option<i64>,
        reason: AcceptedReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            observed_generation,
            reason,
            message: message.into(),
        }
    }
}

// === impl Reconciler ===

impl Reconciler {
    /// Walks every policy, resolves and validates its target chain, and
    /// accumulates the accepted bindings into a fresh translation state.
    ///
    /// Only non-recoverable cluster reads return an error; a missing or
    /// malformed target is a per-policy outcome, not a failure of the pass.
    pub(crate) async fn build_translation_state(
        &self,
        policies: &[HTTPFilterPolicy],
    ) -> Result<TranslationOutcome, ClusterError> {
        let mut state = InitState::default();
        let mut statuses = Vec::new();
        let mut gateway_refs: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();

        for policy in policies {
            let id = ResourceId::of(policy);
            let generation = policy.metadata.generation;
            let target = &policy.spec.target_ref;

            if policy.spec_changed() {
                // The admission webhook normally rejects these before they are
                // stored; re-check in case it was bypassed.
                if let Err(error) = validate_http_filter_policy(policy) {
                    tracing::warn!(%id, %error, "invalid HTTPFilterPolicy");
                    statuses.push(PolicyOutcome::new(
                        id,
                        generation,
                        AcceptedReason::Invalid,
                        error.to_string(),
                    ));
                    continue;
                }
                if let Some(namespace) = &target.namespace {
                    if *namespace != id.namespace {
                        let message = "namespace in targetRef doesn't match the policy's namespace";
                        tracing::warn!(%id, "invalid HTTPFilterPolicy: {message}");
                        statuses.push(PolicyOutcome::new(
                            id,
                            generation,
                            AcceptedReason::Invalid,
                            message,
                        ));
                        continue;
                    }
                }
            } else if policy.marked_invalid() {
                continue;
            }

            let mut accepted = false;
            if target.group == TARGET_GROUP_ISTIO && target.kind == TARGET_KIND_VIRTUAL_SERVICE {
                let target_id = ResourceId::new(id.namespace.clone(), target.name.clone());
                let virtual_service = match self.api.get_virtual_service(&target_id).await? {
                    Some(vs) => vs,
                    None => {
                        statuses.push(PolicyOutcome::new(
                            id,
                            generation,
                            AcceptedReason::TargetNotFound,
                            "",
                        ));
                        continue;
                    }
                };

                // A target that exists but has an unsupported shape reads the
                // same as a missing one, with the reason in the message.
                if let Err(error) = validate_virtual_service(&virtual_service) {
                    tracing::info!(%target_id, %error, "unsupported VirtualService");
                    statuses.push(PolicyOutcome::new(
                        id,
                        generation,
                        AcceptedReason::TargetNotFound,
                        error.to_string(),
                    ));
                    continue;
                }

                if let Some(section) = &target.section_name {
                    let found = virtual_service
                        .spec
                        .http
                        .iter()
                        .any(|s| s.name.as_deref() == Some(section.as_str()));
                    if !found {
                        statuses.push(PolicyOutcome::new(
                            id,
                            generation,
                            AcceptedReason::TargetNotFound,
                            "",
                        ));
                        continue;
                    }
                }

                for gateway_name in &virtual_service.spec.gateways {
                    if gateway_name == MESH_GATEWAY {
                        tracing::info!(%target_id, "skipping unsupported mesh gateway");
                        continue;
                    }
                    if gateway_name.contains('/') {
                        tracing::info!(
                            %target_id,
                            gateway = %gateway_name,
                            "skipping gateway from another namespace",
                        );
                        continue;
                    }

                    let gateway_id =
                        ResourceId::new(target_id.namespace.clone(), gateway_name.clone());
                    let gateway = match self.api.get_gateway(&gateway_id).await? {
                        Some(gw) => gw,
                        None => {
                            tracing::info!(%target_id, gateway = %gateway_name, "gateway not found");
                            continue;
                        }
                    };
                    if let Err(error) = validate_gateway(&gateway) {
                        tracing::info!(%gateway_id, %error, "unsupported Gateway");
                        continue;
                    }

                    state.add_policy_for_virtual_service(policy, &virtual_service, &gateway);
                    // The gateway itself is deliberately not labeled as
                    // affected; the relationship lives only in this in-memory
                    // index. Whether a host is affected can be read off the
                    // existence of its generated EnvoyFilter.
                    gateway_refs.entry(gateway_id).or_default().push(id.clone());
                    accepted = true;
                }
            } else {
                tracing::debug!(
                    %id,
                    group = %target.group,
                    kind = %target.kind,
                    "unsupported targetRef kind",
                );
            }

            if accepted {
                statuses.push(PolicyOutcome::new(id, generation, AcceptedReason::Accepted, ""));
            } else {
                statuses.push(PolicyOutcome::new(
                    id,
                    generation,
                    AcceptedReason::TargetNotFound,
                    "invalid target resource",
                ));
            }
        }

        Ok(TranslationOutcome {
            state,
            statuses,
            gateway_refs,
        })
    }
}
