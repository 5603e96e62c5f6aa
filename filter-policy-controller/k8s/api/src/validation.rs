use crate::istio::{Gateway, VirtualService};
use crate::policy::HTTPFilterPolicy;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("policy defines no filters")]
    NoFilters,

    #[error("filter {0}: configuration must be a JSON object")]
    FilterNotObject(String),

    #[error("virtual service has no hosts")]
    NoHosts,

    #[error("virtual service has no HTTP routes")]
    NoHttpRoutes,

    #[error("HTTP route {0} has no name")]
    UnnamedRoute(usize),

    #[error("gateway has no servers")]
    NoServers,

    #[error("gateway server {number} uses unsupported protocol {protocol}")]
    UnsupportedProtocol { number: u32, protocol: String },
}

/// Structural validation of a policy's spec.
///
/// The admission webhook normally rejects malformed policies before they are
/// stored; the controller re-checks in case it was bypassed.
pub fn validate_http_filter_policy(policy: &HTTPFilterPolicy) -> Result<(), ValidationError> {
    if policy.spec.filters.is_empty() {
        return Err(ValidationError::NoFilters);
    }
    for (name, config) in &policy.spec.filters {
        if !config.is_object() {
            return Err(ValidationError::FilterNotObject(name.clone()));
        }
    }
    Ok(())
}

/// Whether a virtual service has a shape the translation engine can consume.
/// Routes must be named so section-scoped policies can address them.
pub fn validate_virtual_service(vs: &VirtualService) -> Result<(), ValidationError> {
    if vs.spec.hosts.is_empty() {
        return Err(ValidationError::NoHosts);
    }
    if vs.spec.http.is_empty() {
        return Err(ValidationError::NoHttpRoutes);
    }
    for (i, section) in vs.spec.http.iter().enumerate() {
        if section.name.as_deref().unwrap_or("").is_empty() {
            return Err(ValidationError::UnnamedRoute(i));
        }
    }
    Ok(())
}

/// Whether a gateway has a shape the translation engine can consume. Only
/// plain HTTP listeners are supported.
pub fn validate_gateway(gw: &Gateway) -> Result<(), ValidationError> {
    if gw.spec.servers.is_empty() {
        return Err(ValidationError::NoServers);
    }
    for server in &gw.spec.servers {
        if !server.port.protocol.eq_ignore_ascii_case("http") {
            return Err(ValidationError::UnsupportedProtocol {
                number: server.port.number,
                protocol: server.port.protocol.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::istio::{GatewayPort, GatewayServer, GatewaySpec, HttpRouteSection, VirtualServiceSpec};
    use crate::policy::{HTTPFilterPolicySpec, TargetRef};
    use serde_json::json;

    fn target_ref() -> TargetRef {
        TargetRef {
            group: "networking.istio.io".to_string(),
            kind: "VirtualService".to_string(),
            name: "vs-0".to_string(),
            namespace: None,
            section_name: None,
        }
    }

    #[test]
    fn policy_must_define_filters() {
        let policy = HTTPFilterPolicy::new(
            "policy-0",
            HTTPFilterPolicySpec {
                target_ref: target_ref(),
                filters: Default::default(),
            },
        );
        assert_eq!(
            validate_http_filter_policy(&policy),
            Err(ValidationError::NoFilters)
        );
    }

    #[test]
    fn filter_configs_must_be_objects() {
        let mut policy = HTTPFilterPolicy::new(
            "policy-0",
            HTTPFilterPolicySpec {
                target_ref: target_ref(),
                filters: Default::default(),
            },
        );
        policy
            .spec
            .filters
            .insert("limitReq".to_string(), json!({"average": 1}));
        assert_eq!(validate_http_filter_policy(&policy), Ok(()));

        policy
            .spec
            .filters
            .insert("broken".to_string(), json!("not an object"));
        assert_eq!(
            validate_http_filter_policy(&policy),
            Err(ValidationError::FilterNotObject("broken".to_string()))
        );
    }

    #[test]
    fn virtual_service_routes_must_be_named() {
        let vs = VirtualService::new(
            "vs-0",
            VirtualServiceSpec {
                hosts: vec!["example.com".to_string()],
                gateways: vec!["gw-0".to_string()],
                http: vec![
                    HttpRouteSection {
                        name: Some("route-0".to_string()),
                        rest: Default::default(),
                    },
                    HttpRouteSection {
                        name: None,
                        rest: Default::default(),
                    },
                ],
            },
        );
        assert_eq!(
            validate_virtual_service(&vs),
            Err(ValidationError::UnnamedRoute(1))
        );
    }

    #[test]
    fn virtual_service_must_have_hosts_and_routes() {
        let vs = VirtualService::new("vs-0", VirtualServiceSpec::default());
        assert_eq!(validate_virtual_service(&vs), Err(ValidationError::NoHosts));

        let vs = VirtualService::new(
            "vs-0",
            VirtualServiceSpec {
                hosts: vec!["example.com".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(
            validate_virtual_service(&vs),
            Err(ValidationError::NoHttpRoutes)
        );
    }

    #[test]
    fn gateway_servers_must_speak_http() {
        let gw = Gateway::new("gw-0", GatewaySpec::default());
        assert_eq!(validate_gateway(&gw), Err(ValidationError::NoServers));

        let gw = Gateway::new(
            "gw-0",
            GatewaySpec {
                servers: vec![GatewayServer {
                    port: GatewayPort {
                        number: 443,
                        protocol: "HTTPS".to_string(),
                        name: "https".to_string(),
                    },
                    hosts: vec!["*".to_string()],
                }],
                selector: Default::default(),
            },
        );
        assert_eq!(
            validate_gateway(&gw),
            Err(ValidationError::UnsupportedProtocol {
                number: 443,
                protocol: "HTTPS".to_string()
            })
        );

        let gw = Gateway::new(
            "gw-0",
            GatewaySpec {
                servers: vec![GatewayServer {
                    port: GatewayPort {
                        number: 80,
                        protocol: "HTTP".to_string(),
                        name: "http".to_string(),
                    },
                    hosts: vec!["*".to_string()],
                }],
                selector: Default::default(),
            },
        );
        assert_eq!(validate_gateway(&gw), Ok(()));
    }
}
