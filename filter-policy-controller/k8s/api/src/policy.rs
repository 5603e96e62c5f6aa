mod http_filter_policy;

pub use self::http_filter_policy::{
    HTTPFilterPolicy, HTTPFilterPolicySpec, HTTPFilterPolicyStatus, TargetRef,
};

use std::fmt;

/// Group of the routing resources a policy may attach to.
pub const TARGET_GROUP_ISTIO: &str = "networking.istio.io";

/// The only target kind currently resolved by the controller.
pub const TARGET_KIND_VIRTUAL_SERVICE: &str = "VirtualService";

/// Type of the single condition the controller manages on every policy.
pub const CONDITION_ACCEPTED: &str = "Accepted";

/// Reason recorded on the `Accepted` condition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AcceptedReason {
    /// At least one gateway in the target chain accepted the policy.
    Accepted,
    /// The policy itself is malformed; no target resolution was attempted.
    Invalid,
    /// The target chain could not be resolved to a usable resource.
    TargetNotFound,
}

// === impl AcceptedReason ===

impl AcceptedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Invalid => "Invalid",
            Self::TargetNotFound => "TargetNotFound",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl fmt::Display for AcceptedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
