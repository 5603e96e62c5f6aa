//! The subset of Istio's networking resources this controller reads and
//! writes. Fields the controller does not interpret are preserved as opaque
//! values so objects round-trip losslessly.

mod envoy_filter;
mod gateway;
mod virtual_service;

pub use self::envoy_filter::{EnvoyFilter, EnvoyFilterSpec};
pub use self::gateway::{Gateway, GatewayPort, GatewayServer, GatewaySpec};
pub use self::virtual_service::{HttpRouteSection, VirtualService, VirtualServiceSpec};

/// Gateway reference value binding a virtual service to the mesh-internal
/// listeners rather than a named gateway.
pub const MESH_GATEWAY: &str = "mesh";
