use super::ResourceId;
use ahash::AHashMap as HashMap;
use parking_lot::RwLock;

/// Gateway identity → policies that currently depend on it.
///
/// Written by the reconciler, which replaces the whole mapping after a
/// successful build pass, and read by the gateway watcher from the event
/// dispatch path, possibly concurrently with a replacement. The mapping is
/// never mutated in place under a read lock. After a failed pass the previous
/// mapping stays in place; a stale entry can only cost trigger precision, and
/// a missed trigger only delays convergence until the next event.
#[derive(Debug, Default)]
pub struct GatewayRefIndex {
    index: RwLock<HashMap<ResourceId, Vec<ResourceId>>>,
}

// === impl GatewayRefIndex ===

impl GatewayRefIndex {
    /// Policies recorded as depending on the given gateway.
    pub fn dependents(&self, gateway: &ResourceId) -> Vec<ResourceId> {
        self.index.read().get(gateway).cloned().unwrap_or_default()
    }

    /// Atomically replaces the whole mapping with a freshly built one.
    pub fn replace(&self, index: HashMap<ResourceId, Vec<ResourceId>>) {
        *self.index.write() = index;
    }
}
