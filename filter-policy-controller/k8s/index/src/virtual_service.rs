use super::{send_trigger, ResourceId, TriggerSender};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use filter_policy_controller_k8s_api::istio::VirtualService;
use filter_policy_controller_k8s_api::policy::{
    HTTPFilterPolicy, TARGET_GROUP_ISTIO, TARGET_KIND_VIRTUAL_SERVICE,
};
use kubert::index::IndexNamespacedResource;
use parking_lot::RwLock;
use std::sync::Arc;

pub type SharedVirtualServiceIndex = Arc<RwLock<VirtualServiceIndex>>;

/// Routes policy and virtual-service changes into reconciliation.
///
/// The policy half maintains the target-reference lookup table
/// (virtual-service name → dependent policies) so that a virtual-service
/// event finds its dependents without scanning every policy, and requests
/// reconciliation for every generation-level policy change. The
/// virtual-service half consults the table and requests reconciliation when
/// any dependent exists.
#[derive(Debug)]
pub struct VirtualServiceIndex {
    triggers: TriggerSender,

    // virtual-service name → policies whose targetRef names it
    by_target: HashMap<String, HashSet<ResourceId>>,
    // policy → the target name it is currently filed under
    target_of: HashMap<ResourceId, String>,

    // Last seen generation per resource. Status and metadata updates keep
    // the generation, and re-triggering on those would loop on the
    // controller's own status writes.
    policy_generations: HashMap<ResourceId, Option<i64>>,
    generations: HashMap<ResourceId, Option<i64>>,
}

// === impl VirtualServiceIndex ===

impl VirtualServiceIndex {
    pub fn shared(triggers: TriggerSender) -> SharedVirtualServiceIndex {
        Arc::new(RwLock::new(Self {
            triggers,
            by_target: HashMap::new(),
            target_of: HashMap::new(),
            policy_generations: HashMap::new(),
            generations: HashMap::new(),
        }))
    }

    /// Policies currently filed under the given virtual-service name.
    pub fn policies_targeting(&self, name: &str) -> Vec<ResourceId> {
        self.by_target
            .get(name)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn unfile(&mut self, policy: &ResourceId) {
        if let Some(target) = self.target_of.remove(policy) {
            if let Some(deps) = self.by_target.get_mut(&target) {
                deps.remove(policy);
                if deps.is_empty() {
                    self.by_target.remove(&target);
                }
            }
        }
    }

    fn trigger_if_targeted(&self, id: ResourceId) {
        let targeted = self
            .by_target
            .get(&id.name)
            .map(|deps| !deps.is_empty())
            .unwrap_or(false);
        if targeted {
            // One request covers every dependent: reconciliation rebuilds the
            // full desired state.
            send_trigger(&self.triggers, "VirtualService", id);
        }
    }
}

impl IndexNamespacedResource<HTTPFilterPolicy> for VirtualServiceIndex {
    fn apply(&mut self, policy: HTTPFilterPolicy) {
        let id = ResourceId::of(&policy);
        let generation = policy.metadata.generation;
        if self.policy_generations.get(&id) == Some(&generation) {
            return;
        }
        self.policy_generations.insert(id.clone(), generation);

        self.unfile(&id);
        let target = &policy.spec.target_ref;
        if target.group == TARGET_GROUP_ISTIO && target.kind == TARGET_KIND_VIRTUAL_SERVICE {
            self.by_target
                .entry(target.name.clone())
                .or_default()
                .insert(id.clone());
            self.target_of.insert(id.clone(), target.name.clone());
        }

        send_trigger(&self.triggers, "HTTPFilterPolicy", id);
    }

    fn delete(&mut self, namespace: String, name: String) {
        let id = ResourceId::new(namespace, name);
        self.policy_generations.remove(&id);
        self.unfile(&id);
        send_trigger(&self.triggers, "HTTPFilterPolicy", id);
    }
}

impl IndexNamespacedResource<VirtualService> for VirtualServiceIndex {
    fn apply(&mut self, vs: VirtualService) {
        let id = ResourceId::of(&vs);
        let generation = vs.metadata.generation;
        if self.generations.get(&id) == Some(&generation) {
            return;
        }
        self.generations.insert(id.clone(), generation);
        self.trigger_if_targeted(id);
    }

    fn delete(&mut self, namespace: String, name: String) {
        let id = ResourceId::new(namespace, name);
        self.generations.remove(&id);
        self.trigger_if_targeted(id);
    }
}
