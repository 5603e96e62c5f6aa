//! In-memory indexes that route resource change events into reconciliation.
//!
//! Watch events for the policy resource and its upstream dependencies are
//! applied to these indexes by the runtime; the indexes decide which events
//! warrant a reconcile request and enqueue at most one per event. The
//! reconciler never consumes a request's identity — every pass rebuilds the
//! full desired state — so requests only need to exist, not to be precise.

mod gateway;
mod gateway_refs;
mod resource_id;
mod virtual_service;


pub use self::gateway::{GatewayIndex, SharedGatewayIndex};
pub use self::gateway_refs::GatewayRefIndex;
pub use self::resource_id::ResourceId;
pub use self::virtual_service::{SharedVirtualServiceIndex, VirtualServiceIndex};

use tokio::sync::mpsc;

/// A reconcile request: something the controller depends on changed.
///
/// The kind and id are carried for logging only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trigger {
    pub kind: &'static str,
    pub id: ResourceId,
}

pub type TriggerSender = mpsc::UnboundedSender<Trigger>;
pub type TriggerReceiver = mpsc::UnboundedReceiver<Trigger>;

pub(crate) fn send_trigger(triggers: &TriggerSender, kind: &'static str, id: ResourceId) {
    tracing::debug!(kind, %id, "target changed; requesting reconciliation");
    if triggers.send(Trigger { kind, id }).is_err() {
        tracing::error!(kind, "reconcile trigger channel closed");
    }
}
