use super::{send_trigger, GatewayRefIndex, ResourceId, TriggerSender};
use ahash::AHashMap as HashMap;
use filter_policy_controller_k8s_api::istio::Gateway;
use kubert::index::IndexNamespacedResource;
use parking_lot::RwLock;
use std::sync::Arc;

pub type SharedGatewayIndex = Arc<RwLock<GatewayIndex>>;

/// Routes gateway changes into reconciliation by consulting the shared
/// gateway-reference index built by the last successful reconciliation pass.
#[derive(Debug)]
pub struct GatewayIndex {
    triggers: TriggerSender,
    refs: Arc<GatewayRefIndex>,
    generations: HashMap<ResourceId, Option<i64>>,
}

// === impl GatewayIndex ===

impl GatewayIndex {
    pub fn shared(refs: Arc<GatewayRefIndex>, triggers: TriggerSender) -> SharedGatewayIndex {
        Arc::new(RwLock::new(Self {
            triggers,
            refs,
            generations: HashMap::new(),
        }))
    }

    fn trigger_if_depended_on(&self, id: ResourceId) {
        if !self.refs.dependents(&id).is_empty() {
            // A single request is enough regardless of how many policies
            // depend on this gateway.
            send_trigger(&self.triggers, "Gateway", id);
        }
    }
}

impl IndexNamespacedResource<Gateway> for GatewayIndex {
    fn apply(&mut self, gateway: Gateway) {
        let id = ResourceId::of(&gateway);
        let generation = gateway.metadata.generation;
        if self.generations.get(&id) == Some(&generation) {
            return;
        }
        self.generations.insert(id.clone(), generation);
        self.trigger_if_depended_on(id);
    }

    fn delete(&mut self, namespace: String, name: String) {
        let id = ResourceId::new(namespace, name);
        self.generations.remove(&id);
        self.trigger_if_depended_on(id);
    }
}
