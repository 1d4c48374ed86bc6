use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;

use crate::crd::ElasticsearchNodeRole;
use crate::error::Result;

pub const PHASE_PENDING: &str = "Pending";
pub const PHASE_RUNNING: &str = "Running";
pub const PHASE_FAILED: &str = "Failed";

/// Label selector matching every pod of a cluster.
pub fn cluster_label_selector(cluster_name: &str) -> String {
    format!("component={}", cluster_name)
}

/// Label selector matching the pods of a cluster that carry `role`.
pub fn role_label_selector(
    cluster_name: &str,
    role: ElasticsearchNodeRole,
) -> String {
    format!(
        "{},{}=true",
        cluster_label_selector(cluster_name),
        role.label_key()
    )
}

pub fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

/// True when every reported container is ready. A pod without container
/// statuses is considered ready.
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|cs| cs.iter().all(|c| c.ready))
        .unwrap_or(true)
}

/// Lists pods by label selector.
#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>>;

    /// Pods of the cluster currently in phase Running, in listing order.
    async fn list_running(
        &self,
        namespace: &str,
        cluster_name: &str,
    ) -> Result<Vec<Pod>> {
        let pods = self
            .list(namespace, &cluster_label_selector(cluster_name))
            .await?;
        Ok(pods
            .into_iter()
            .filter(|p| pod_phase(p) == Some(PHASE_RUNNING))
            .collect())
    }
}

#[derive(Clone)]
pub struct KubePodLister {
    client: Client,
}

impl KubePodLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodLister for KubePodLister {
    #[tracing::instrument(level = "trace", skip(self))]
    async fn list(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default().labels(selector)).await?;
        Ok(list.items)
    }

    async fn list_running(
        &self,
        namespace: &str,
        cluster_name: &str,
    ) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default()
            .labels(&cluster_label_selector(cluster_name))
            .fields(&format!("status.phase={}", PHASE_RUNNING));
        let list = api.list(&lp).await?;
        tracing::trace!(
            ns = %namespace,
            cluster = %cluster_name,
            count = list.items.len(),
            "running pods"
        );
        Ok(list.items)
    }
}
