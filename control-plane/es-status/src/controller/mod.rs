use std::sync::Arc;

use futures_util::StreamExt;
use kube::{
    Client, Resource, ResourceExt,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::config::StatusConfig;
use crate::crd::Elasticsearch;
use crate::error::Error;
use crate::exec::KubePodExecutor;
use crate::pods::KubePodLister;
use crate::status::{ClusterHealthProbe, PodRoleAggregator, StatusReconciler};
use crate::store::{ClusterRef, KubeClusterStore};

pub mod observed;

pub use observed::{ObservedWorkloads, build_nodes, observe_workloads};

pub struct ControllerContext {
    pub client: Client,
    pub cfg: StatusConfig,
    pub reconciler: StatusReconciler,
}

impl ControllerContext {
    /// Wire the kube-backed collaborators from configuration.
    pub fn new(client: Client, cfg: StatusConfig) -> crate::Result<Self> {
        let mode = cfg.credential_mode()?;
        let lister = Arc::new(KubePodLister::new(client.clone()));
        let health = ClusterHealthProbe::new(
            lister.clone(),
            Arc::new(KubePodExecutor::new(mode)),
        )
        .with_container(cfg.health_container.clone());
        let reconciler = StatusReconciler::new(
            Arc::new(KubeClusterStore::new(client.clone())),
            health,
            PodRoleAggregator::new(lister),
        )
        .with_retry(cfg.retry_policy()?);
        Ok(Self {
            client,
            cfg,
            reconciler,
        })
    }
}

pub async fn run_controller(
    client: Client,
    cfg: StatusConfig,
) -> anyhow::Result<()> {
    let api: Api<Elasticsearch> = match cfg.watch_namespace.as_deref() {
        Some(ns) if !ns.is_empty() => Api::namespaced(client.clone(), ns),
        _ => Api::all(client.clone()),
    };
    let ctx = Arc::new(ControllerContext::new(client, cfg)?);

    Controller::new(api, Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(name = %obj_ref.name, "reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
async fn reconcile(
    obj: Arc<Elasticsearch>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, Error> {
    if obj.meta().deletion_timestamp.is_some() {
        return Ok(Action::await_change());
    }
    let cluster = ClusterRef::from_resource(&obj);

    let observed = observe_workloads(
        ctx.client.clone(),
        &cluster.namespace,
        &cluster.name,
    )
    .await;
    let nodes = build_nodes(&observed);

    ctx.reconciler.update_status(&cluster, &nodes).await?;
    Ok(Action::requeue(ctx.cfg.requeue_after()))
}

fn error_policy(
    obj: Arc<Elasticsearch>,
    error: &Error,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(name = %obj.name_any(), %error, "status update failed");
    if error.is_retriable() {
        Action::requeue(Duration::from_secs(5))
    } else {
        Action::requeue(ctx.cfg.requeue_after())
    }
}
