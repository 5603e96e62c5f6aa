use crate::{core::DefaultTranslator, index, k8s, reconcile};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::{sync::mpsc, time::Duration};
use tracing::{info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "filter-policy-controller",
    about = "Projects HTTPFilterPolicy resources onto generated proxy configuration"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "filter_policy_controller=info,warn",
        env = "FILTER_POLICY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Namespace the generated EnvoyFilters are written to.
    #[clap(long, default_value = "istio-system")]
    control_plane_namespace: String,

    /// Period of the full-resync reconciliation, which also bounds how long a
    /// failed pass waits before being retried.
    #[clap(long, default_value = "300")]
    reconcile_period_seconds: u64,
}

// === impl Args ===

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            control_plane_namespace,
            reconcile_period_seconds,
        } = self;

        let mut prom = <Registry>::default();
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let (triggers_tx, triggers_rx) = mpsc::unbounded_channel();
        let gateway_refs = Arc::new(index::GatewayRefIndex::default());

        // The policy watch both maintains the target-reference lookup table
        // and requests reconciliation; the dependency watches only request.
        let virtual_services_index = index::VirtualServiceIndex::shared(triggers_tx.clone());
        let gateways_index = index::GatewayIndex::shared(gateway_refs.clone(), triggers_tx);

        let policies =
            runtime.watch_all::<k8s::policy::HTTPFilterPolicy>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(virtual_services_index.clone(), policies)
                .instrument(info_span!("httpfilterpolicies")),
        );

        let virtual_services =
            runtime.watch_all::<k8s::istio::VirtualService>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(virtual_services_index, virtual_services)
                .instrument(info_span!("virtualservices")),
        );

        let gateways = runtime.watch_all::<k8s::istio::Gateway>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(gateways_index, gateways).instrument(info_span!("gateways")),
        );

        // The generated EnvoyFilters are deliberately not watched: a manual
        // correction to one of them sticks until some input changes.

        let reconciler = Arc::new(reconcile::Reconciler::new(
            Arc::new(reconcile::KubeClusterApi::new(runtime.client())),
            Arc::new(DefaultTranslator),
            gateway_refs,
            control_plane_namespace,
        ));
        tokio::spawn(
            reconcile::run(
                reconciler,
                triggers_rx,
                Duration::from_secs(reconcile_period_seconds),
            )
            .instrument(info_span!("reconcile")),
        );

        // Block on the shutdown signal; the watch and reconcile tasks are
        // aborted with the runtime.
        if runtime.run().await.is_err() {
            bail!("aborted");
        }
        Ok(())
    }
}
