//! Cluster-state store access.
//!
//! The reconciler reads and writes through [`ClusterApi`] so the core can be
//! exercised against an in-memory store; [`KubeClusterApi`] is the live
//! implementation. "Not found" on point reads is a modeled outcome
//! (`Ok(None)`), never an error.

use async_trait::async_trait;
use filter_policy_controller_k8s_api::istio::{EnvoyFilter, Gateway, VirtualService};
use filter_policy_controller_k8s_api::policy::{HTTPFilterPolicy, HTTPFilterPolicyStatus};
use filter_policy_controller_k8s_api::{Api, Patch, PatchParams, CREATED_BY, LABEL_CREATED_BY};
use filter_policy_controller_k8s_index::ResourceId;
use kube::api::{DeleteParams, ListParams, PostParams};
use thiserror::Error;

/// A cluster read or write failed for a reason other than "not found".
///
/// Carries enough context (verb, kind, namespaced name) to diagnose without
/// re-deriving call stacks; the scheduler decides whether and when to retry.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to list {kind}")]
    List {
        kind: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to {verb} {kind} {id}")]
    Object {
        verb: &'static str,
        kind: &'static str,
        id: ResourceId,
        #[source]
        source: anyhow::Error,
    },
}

// === impl ClusterError ===

impl ClusterError {
    pub fn list(kind: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::List {
            kind,
            source: source.into(),
        }
    }

    pub fn object(
        verb: &'static str,
        kind: &'static str,
        id: ResourceId,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Object {
            verb,
            kind,
            id,
            source: source.into(),
        }
    }
}

/// The cluster operations the reconciler depends on.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_policies(&self) -> Result<Vec<HTTPFilterPolicy>, ClusterError>;

    async fn get_virtual_service(
        &self,
        id: &ResourceId,
    ) -> Result<Option<VirtualService>, ClusterError>;

    async fn get_gateway(&self, id: &ResourceId) -> Result<Option<Gateway>, ClusterError>;

    /// Generated objects currently bearing the ownership label. Objects
    /// without the label are invisible to the reconciler and thus never
    /// touched.
    async fn list_owned_envoy_filters(&self) -> Result<Vec<EnvoyFilter>, ClusterError>;

    async fn create_envoy_filter(&self, filter: &EnvoyFilter) -> Result<(), ClusterError>;

    /// Replaces an existing generated object. The caller carries the live
    /// object's `resourceVersion` on `filter` to avoid spurious conflicts.
    async fn replace_envoy_filter(&self, filter: &EnvoyFilter) -> Result<(), ClusterError>;

    async fn delete_envoy_filter(&self, id: &ResourceId) -> Result<(), ClusterError>;

    async fn patch_policy_status(
        &self,
        id: &ResourceId,
        status: &HTTPFilterPolicyStatus,
    ) -> Result<(), ClusterError>;
}

/// [`ClusterApi`] backed by a live [`kube::Client`].
#[derive(Clone)]
pub struct KubeClusterApi {
    client: kube::Client,
}

// === impl KubeClusterApi ===

impl KubeClusterApi {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn envoy_filters(&self, namespace: &str) -> Api<EnvoyFilter> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn ok_if_not_found<T>(result: kube::Result<T>) -> kube::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(None),
        Err(error) => Err(error),
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_policies(&self) -> Result<Vec<HTTPFilterPolicy>, ClusterError> {
        Api::<HTTPFilterPolicy>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|error| ClusterError::list("HTTPFilterPolicy", error))
    }

    async fn get_virtual_service(
        &self,
        id: &ResourceId,
    ) -> Result<Option<VirtualService>, ClusterError> {
        let api = Api::<VirtualService>::namespaced(self.client.clone(), &id.namespace);
        ok_if_not_found(api.get(&id.name).await)
            .map_err(|error| ClusterError::object("get", "VirtualService", id.clone(), error))
    }

    async fn get_gateway(&self, id: &ResourceId) -> Result<Option<Gateway>, ClusterError> {
        let api = Api::<Gateway>::namespaced(self.client.clone(), &id.namespace);
        ok_if_not_found(api.get(&id.name).await)
            .map_err(|error| ClusterError::object("get", "Gateway", id.clone(), error))
    }

    async fn list_owned_envoy_filters(&self) -> Result<Vec<EnvoyFilter>, ClusterError> {
        let selector = format!("{LABEL_CREATED_BY}={CREATED_BY}");
        Api::<EnvoyFilter>::all(self.client.clone())
            .list(&ListParams::default().labels(&selector))
            .await
            .map(|list| list.items)
            .map_err(|error| ClusterError::list("EnvoyFilter", error))
    }

    async fn create_envoy_filter(&self, filter: &EnvoyFilter) -> Result<(), ClusterError> {
        let id = ResourceId::of(filter);
        self.envoy_filters(&id.namespace)
            .create(&PostParams::default(), filter)
            .await
            .map(|_| ())
            .map_err(|error| ClusterError::object("create", "EnvoyFilter", id, error))
    }

    async fn replace_envoy_filter(&self, filter: &EnvoyFilter) -> Result<(), ClusterError> {
        let id = ResourceId::of(filter);
        self.envoy_filters(&id.namespace)
            .replace(&id.name, &PostParams::default(), filter)
            .await
            .map(|_| ())
            .map_err(|error| ClusterError::object("update", "EnvoyFilter", id, error))
    }

    async fn delete_envoy_filter(&self, id: &ResourceId) -> Result<(), ClusterError> {
        self.envoy_filters(&id.namespace)
            .delete(&id.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|error| ClusterError::object("delete", "EnvoyFilter", id.clone(), error))
    }

    async fn patch_policy_status(
        &self,
        id: &ResourceId,
        status: &HTTPFilterPolicyStatus,
    ) -> Result<(), ClusterError> {
        let api = Api::<HTTPFilterPolicy>::namespaced(self.client.clone(), &id.namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(
            &id.name,
            &PatchParams::apply("meshfilter.io"),
            &Patch::Merge(patch),
        )
        .await
        .map(|_| ())
        .map_err(|error| {
            ClusterError::object("update status of", "HTTPFilterPolicy", id.clone(), error)
        })
    }
}
