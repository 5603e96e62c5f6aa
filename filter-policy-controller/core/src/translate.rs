use super::{FinalState, InitState, TranslationError, Translator};
use filter_policy_controller_k8s_api::istio::{EnvoyFilter, EnvoyFilterSpec};
use filter_policy_controller_k8s_api::ResourceExt;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

pub const GENERATED_NAME_PREFIX: &str = "mf-h-";

/// Derives a generated object's name from a virtual-service host.
///
/// A leading wildcard label collapses to `-`: `*.example.com` maps to
/// `mf-h--example.com` while `www.example.com` maps to
/// `mf-h-www.example.com`. This scheme is the stable contract the
/// reconciler's diffing relies on; renaming hosts renames (and so replaces)
/// the generated objects.
pub fn generated_name(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    match host.strip_prefix("*.") {
        Some(rest) => format!("{GENERATED_NAME_PREFIX}-{rest}"),
        None => format!("{GENERATED_NAME_PREFIX}{host}"),
    }
}

/// Host-keyed translation: one EnvoyFilter per virtual-service host carrying
/// one HTTP filter patch per attached policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTranslator;

#[derive(Default)]
struct HostEntry {
    hosts: BTreeSet<String>,
    gateways: BTreeSet<String>,
    // Keyed by policy identity so a policy reaching the same host through
    // several gateways contributes a single patch.
    patches: BTreeMap<(String, String), Value>,
}

impl Translator for DefaultTranslator {
    fn process(&self, state: InitState) -> Result<FinalState, TranslationError> {
        // Everything is accumulated into ordered collections so the output is
        // identical across passes regardless of accumulation order.
        let mut entries: BTreeMap<String, HostEntry> = BTreeMap::new();

        for attachment in state.attachments() {
            let policy = &attachment.policy;
            let policy_namespace = policy.namespace().unwrap_or_default();
            let policy_name = policy.name_unchecked();

            let gateway = format!(
                "{}/{}",
                attachment.gateway.namespace().unwrap_or_default(),
                attachment.gateway.name_unchecked(),
            );

            for host in &attachment.virtual_service.spec.hosts {
                let entry = entries.entry(generated_name(host)).or_default();
                entry.hosts.insert(host.to_ascii_lowercase());
                entry.gateways.insert(gateway.clone());

                let mut patch = json!({
                    "policy": format!("{policy_namespace}/{policy_name}"),
                    "filters": policy.spec.filters,
                });
                if let Some(section) = &policy.spec.target_ref.section_name {
                    patch["sectionName"] = json!(section);
                }
                entry
                    .patches
                    .insert((policy_namespace.clone(), policy_name.clone()), patch);
            }
        }

        let mut final_state = FinalState::default();
        for (name, entry) in entries {
            let HostEntry {
                hosts,
                gateways,
                patches,
            } = entry;
            let config_patches = patches
                .into_values()
                .map(|patch| {
                    json!({
                        "applyTo": "HTTP_FILTER",
                        "match": {
                            "hosts": hosts,
                            "gateways": gateways,
                        },
                        "patch": patch,
                    })
                })
                .collect();

            let filter = EnvoyFilter::new(&name, EnvoyFilterSpec { config_patches });
            final_state.generated.insert(name, filter);
        }

        Ok(final_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter_policy_controller_k8s_api::istio::{
        Gateway, GatewayPort, GatewayServer, GatewaySpec, HttpRouteSection, VirtualService,
        VirtualServiceSpec,
    };
    use filter_policy_controller_k8s_api::policy::{
        HTTPFilterPolicy, HTTPFilterPolicySpec, TargetRef,
    };

    fn policy(name: &str, section: Option<&str>) -> HTTPFilterPolicy {
        let mut policy = HTTPFilterPolicy::new(
            name,
            HTTPFilterPolicySpec {
                target_ref: TargetRef {
                    group: "networking.istio.io".to_string(),
                    kind: "VirtualService".to_string(),
                    name: "vs-0".to_string(),
                    namespace: None,
                    section_name: section.map(Into::into),
                },
                filters: Default::default(),
            },
        );
        policy.metadata.namespace = Some("ns-0".to_string());
        policy
            .spec
            .filters
            .insert("limitReq".to_string(), json!({"average": 10}));
        policy
    }

    fn virtual_service(hosts: &[&str]) -> VirtualService {
        let mut vs = VirtualService::new(
            "vs-0",
            VirtualServiceSpec {
                hosts: hosts.iter().map(|h| h.to_string()).collect(),
                gateways: vec!["gw-0".to_string()],
                http: vec![HttpRouteSection {
                    name: Some("route-0".to_string()),
                    rest: Default::default(),
                }],
            },
        );
        vs.metadata.namespace = Some("ns-0".to_string());
        vs
    }

    fn gateway(name: &str) -> Gateway {
        let mut gw = Gateway::new(
            name,
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
        gw.metadata.namespace = Some("ns-0".to_string());
        gw
    }

    #[test]
    fn names_follow_the_host() {
        assert_eq!(generated_name("www.example.com"), "mf-h-www.example.com");
        assert_eq!(generated_name("*.example.com"), "mf-h--example.com");
        assert_eq!(generated_name("WWW.Example.COM"), "mf-h-www.example.com");
    }

    #[test]
    fn one_filter_per_host() {
        let mut state = InitState::default();
        state.add_policy_for_virtual_service(
            &policy("policy-0", None),
            &virtual_service(&["a.example.com", "b.example.com"]),
            &gateway("gw-0"),
        );

        let out = DefaultTranslator.process(state).unwrap();
        assert_eq!(out.generated.len(), 2);
        assert!(out.generated.contains_key("mf-h-a.example.com"));
        assert!(out.generated.contains_key("mf-h-b.example.com"));
    }

    #[test]
    fn output_is_order_independent() {
        let make = |reversed: bool| {
            let policies = vec![policy("policy-0", None), policy("policy-1", Some("route-0"))];
            let vs = virtual_service(&["example.com"]);
            let gws = vec![gateway("gw-0"), gateway("gw-1")];

            let mut state = InitState::default();
            let order: Vec<usize> = if reversed { vec![1, 0] } else { vec![0, 1] };
            for &p in &order {
                for &g in &order {
                    state.add_policy_for_virtual_service(&policies[p], &vs, &gws[g]);
                }
            }
            DefaultTranslator.process(state).unwrap()
        };

        let a = make(false);
        let b = make(true);
        assert_eq!(a.generated.len(), 1);
        assert_eq!(
            a.generated["mf-h-example.com"].spec,
            b.generated["mf-h-example.com"].spec,
        );
    }

    #[test]
    fn policies_are_deduplicated_across_gateways() {
        let mut state = InitState::default();
        let p = policy("policy-0", Some("route-0"));
        let vs = virtual_service(&["example.com"]);
        state.add_policy_for_virtual_service(&p, &vs, &gateway("gw-0"));
        state.add_policy_for_virtual_service(&p, &vs, &gateway("gw-1"));

        let out = DefaultTranslator.process(state).unwrap();
        let spec = &out.generated["mf-h-example.com"].spec;
        assert_eq!(spec.config_patches.len(), 1);

        let patch = &spec.config_patches[0];
        assert_eq!(patch["match"]["gateways"], json!(["ns-0/gw-0", "ns-0/gw-1"]));
        assert_eq!(patch["patch"]["sectionName"], json!("route-0"));
        assert_eq!(patch["patch"]["policy"], json!("ns-0/policy-0"));
    }
}
