use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generated proxy configuration.
///
/// The patch payload is produced by the translation engine and is opaque
/// here: the reconciler only compares specs for equality and never edits
/// them.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "networking.istio.io",
    version = "v1alpha3",
    kind = "EnvoyFilter",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct EnvoyFilterSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_patches: Vec<serde_json::Value>,
}
