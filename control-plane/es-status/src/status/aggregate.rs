use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::{debug, instrument};

use crate::crd::{ElasticsearchNodeRole, PodStateMap};
use crate::pods::{
    PHASE_FAILED, PHASE_PENDING, PHASE_RUNNING, PodLister, is_pod_ready,
    pod_phase, role_label_selector,
};

/// Groups the pods of each role into ready / notReady / failed.
#[derive(Clone)]
pub struct PodRoleAggregator {
    pods: Arc<dyn PodLister>,
}

impl PodRoleAggregator {
    pub fn new(pods: Arc<dyn PodLister>) -> Self {
        Self { pods }
    }

    /// One entry per role. A role whose listing fails gets an empty map;
    /// the other roles are unaffected.
    #[instrument(level = "debug", skip(self))]
    pub async fn aggregate(
        &self,
        namespace: &str,
        cluster_name: &str,
    ) -> BTreeMap<ElasticsearchNodeRole, PodStateMap> {
        let mut out = BTreeMap::new();
        for role in ElasticsearchNodeRole::ALL {
            let selector = role_label_selector(cluster_name, role);
            let pods = match self.pods.list(namespace, &selector).await {
                Ok(pods) => pods,
                Err(e) => {
                    debug!(%role, error = %e, "aggregate: pod listing failed");
                    Vec::new()
                }
            };
            out.insert(role, pod_state_map(&pods));
        }
        out
    }
}

/// Buckets pods by phase. Phases other than Pending, Running and Failed
/// (e.g. Succeeded, Unknown) land in no bucket.
pub fn pod_state_map(pods: &[Pod]) -> PodStateMap {
    let mut map = PodStateMap::default();
    for pod in pods {
        match pod_phase(pod) {
            Some(PHASE_PENDING) => map.not_ready.push(pod.name_any()),
            Some(PHASE_RUNNING) if is_pod_ready(pod) => {
                map.ready.push(pod.name_any())
            }
            Some(PHASE_RUNNING) => map.not_ready.push(pod.name_any()),
            Some(PHASE_FAILED) => map.failed.push(pod.name_any()),
            _ => {}
        }
    }
    map
}
