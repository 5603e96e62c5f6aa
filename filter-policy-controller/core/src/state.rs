use ahash::AHashMap as HashMap;
use filter_policy_controller_k8s_api::istio::{EnvoyFilter, Gateway, VirtualService};
use filter_policy_controller_k8s_api::policy::HTTPFilterPolicy;

/// Accumulated input to one translation pass.
#[derive(Debug, Default)]
pub struct InitState {
    attachments: Vec<PolicyAttachment>,
}

/// One accepted binding of a policy onto a virtual service through a gateway.
#[derive(Clone, Debug)]
pub struct PolicyAttachment {
    pub policy: HTTPFilterPolicy,
    pub virtual_service: VirtualService,
    pub gateway: Gateway,
}

// === impl InitState ===

impl InitState {
    /// Records that `policy` attaches to `virtual_service` as served by
    /// `gateway`. Called once per usable gateway reference.
    pub fn add_policy_for_virtual_service(
        &mut self,
        policy: &HTTPFilterPolicy,
        virtual_service: &VirtualService,
        gateway: &Gateway,
    ) {
        self.attachments.push(PolicyAttachment {
            policy: policy.clone(),
            virtual_service: virtual_service.clone(),
            gateway: gateway.clone(),
        });
    }

    pub fn attachments(&self) -> &[PolicyAttachment] {
        &self.attachments
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

/// Output of a translation pass: the complete desired set of generated
/// objects, keyed by name.
#[derive(Debug, Default)]
pub struct FinalState {
    pub generated: HashMap<String, EnvoyFilter>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TranslationError(pub String);

/// Turns accumulated policy attachments into generated configuration.
///
/// Implementations must be pure and deterministic: the same attachments
/// produce the same generated objects, names included. The reconciler's
/// diffing depends on that stability, and a failure is treated as terminal
/// for the pass because retrying the same inputs cannot succeed.
pub trait Translator: Send + Sync {
    fn process(&self, state: InitState) -> Result<FinalState, TranslationError>;
}
