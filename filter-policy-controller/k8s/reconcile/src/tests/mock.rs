use crate::cluster::{ClusterApi, ClusterError};
use ahash::AHashMap as HashMap;
use async_trait::async_trait;
use filter_policy_controller_k8s_api::istio::{EnvoyFilter, Gateway, VirtualService};
use filter_policy_controller_k8s_api::policy::{HTTPFilterPolicy, HTTPFilterPolicyStatus};
use filter_policy_controller_k8s_api::{ResourceExt, CREATED_BY, LABEL_CREATED_BY};
use filter_policy_controller_k8s_index::ResourceId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory cluster with write counters, so tests can assert not just
/// the converged state but how many writes it took to get there.
#[derive(Default)]
pub(crate) struct MockCluster {
    pub policies: Mutex<Vec<HTTPFilterPolicy>>,
    pub virtual_services: Mutex<HashMap<ResourceId, VirtualService>>,
    pub gateways: Mutex<HashMap<ResourceId, Gateway>>,
    pub envoy_filters: Mutex<HashMap<String, EnvoyFilter>>,

    pub creates: AtomicUsize,
    pub replaces: AtomicUsize,
    pub deletes: AtomicUsize,
    pub status_patches: AtomicUsize,

    pub fail_virtual_service_reads: AtomicBool,
}

impl MockCluster {
    pub fn insert_policy(&self, policy: HTTPFilterPolicy) {
        self.policies.lock().push(policy);
    }

    pub fn remove_policy(&self, id: &ResourceId) {
        self.policies
            .lock()
            .retain(|p| ResourceId::of(p) != *id);
    }

    pub fn insert_virtual_service(&self, vs: VirtualService) {
        self.virtual_services.lock().insert(ResourceId::of(&vs), vs);
    }

    pub fn insert_gateway(&self, gw: Gateway) {
        self.gateways.lock().insert(ResourceId::of(&gw), gw);
    }

    pub fn insert_envoy_filter(&self, filter: EnvoyFilter) {
        self.envoy_filters
            .lock()
            .insert(filter.name_unchecked(), filter);
    }

    pub fn filter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.envoy_filters.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn policy_condition(&self, id: &ResourceId) -> Option<(String, String)> {
        self.policies
            .lock()
            .iter()
            .find(|p| ResourceId::of(*p) == *id)
            .and_then(|p| p.accepted_condition().cloned())
            .map(|c| (c.reason, c.message))
    }

    /// (creates, replaces, deletes, status patches)
    pub fn write_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.creates.load(Ordering::SeqCst),
            self.replaces.load(Ordering::SeqCst),
            self.deletes.load(Ordering::SeqCst),
            self.status_patches.load(Ordering::SeqCst),
        )
    }
}

fn owned(filter: &EnvoyFilter) -> bool {
    filter
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(LABEL_CREATED_BY))
        .map(|value| value == CREATED_BY)
        .unwrap_or(false)
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn list_policies(&self) -> Result<Vec<HTTPFilterPolicy>, ClusterError> {
        Ok(self.policies.lock().clone())
    }

    async fn get_virtual_service(
        &self,
        id: &ResourceId,
    ) -> Result<Option<VirtualService>, ClusterError> {
        if self.fail_virtual_service_reads.load(Ordering::SeqCst) {
            return Err(ClusterError::object(
                "get",
                "VirtualService",
                id.clone(),
                anyhow::anyhow!("injected failure"),
            ));
        }
        Ok(self.virtual_services.lock().get(id).cloned())
    }

    async fn get_gateway(&self, id: &ResourceId) -> Result<Option<Gateway>, ClusterError> {
        Ok(self.gateways.lock().get(id).cloned())
    }

    async fn list_owned_envoy_filters(&self) -> Result<Vec<EnvoyFilter>, ClusterError> {
        Ok(self
            .envoy_filters
            .lock()
            .values()
            .filter(|f| owned(f))
            .cloned()
            .collect())
    }

    async fn create_envoy_filter(&self, filter: &EnvoyFilter) -> Result<(), ClusterError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut filter = filter.clone();
        filter.metadata.resource_version = Some("1".to_string());
        self.envoy_filters
            .lock()
            .insert(filter.name_unchecked(), filter);
        Ok(())
    }

    async fn replace_envoy_filter(&self, filter: &EnvoyFilter) -> Result<(), ClusterError> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.envoy_filters
            .lock()
            .insert(filter.name_unchecked(), filter.clone());
        Ok(())
    }

    async fn delete_envoy_filter(&self, id: &ResourceId) -> Result<(), ClusterError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.envoy_filters.lock().remove(&id.name);
        Ok(())
    }

    async fn patch_policy_status(
        &self,
        id: &ResourceId,
        status: &HTTPFilterPolicyStatus,
    ) -> Result<(), ClusterError> {
        self.status_patches.fetch_add(1, Ordering::SeqCst);
        let mut policies = self.policies.lock();
        if let Some(policy) = policies.iter_mut().find(|p| ResourceId::of(*p) == *id) {
            policy.status = Some(status.clone());
        }
        Ok(())
    }
}
