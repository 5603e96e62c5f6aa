use super::{AcceptedReason, CONDITION_ACCEPTED};
use crate::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attaches opaque HTTP filter configuration to a routing resource.
///
/// Users own the spec; the controller owns `status` and is the only writer of
/// its `Accepted` condition.
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "meshfilter.io",
    version = "v1alpha1",
    kind = "HTTPFilterPolicy",
    status = "HTTPFilterPolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HTTPFilterPolicySpec {
    /// The resource this policy attaches to.
    pub target_ref: TargetRef,

    /// Filter name to opaque filter configuration, passed through to the
    /// translation engine untouched.
    #[serde(default)]
    pub filters: BTreeMap<String, serde_json::Value>,
}

/// Identifies the resource a policy attaches to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub group: String,
    pub kind: String,
    pub name: String,

    /// When set, must name the policy's own namespace; cross-namespace
    /// targeting is unsupported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Restricts the attachment to one named HTTP route section of the
    /// target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct HTTPFilterPolicyStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// === impl HTTPFilterPolicy ===

impl HTTPFilterPolicy {
    /// The `Accepted` condition recorded by the last reconciliation, if any.
    pub fn accepted_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()?
            .conditions
            .iter()
            .find(|c| c.type_ == CONDITION_ACCEPTED)
    }

    /// Whether the spec changed since the last recorded condition.
    ///
    /// A policy without a condition has never been observed and counts as
    /// changed.
    pub fn spec_changed(&self) -> bool {
        match self.accepted_condition() {
            Some(c) => c.observed_generation != self.metadata.generation,
            None => true,
        }
    }

    /// Whether the last recorded condition marked this policy invalid.
    pub fn marked_invalid(&self) -> bool {
        self.accepted_condition()
            .map(|c| c.reason == AcceptedReason::Invalid.as_str())
            .unwrap_or(false)
    }
}
