use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

use crate::crd::{ElasticsearchNodeRole, ElasticsearchNodeStatus};
use crate::pods::pod_phase;

/// Live resources backing one node. Any of them may be missing while the
/// node is being created.
#[derive(Clone, Debug, Default)]
pub struct ActualState {
    pub deployment: Option<Deployment>,
    pub replica_set: Option<ReplicaSet>,
    pub stateful_set: Option<StatefulSet>,
    pub pod: Option<Pod>,
}

#[derive(Clone, Debug, Default)]
pub struct DesiredState {
    pub roles: Option<Vec<ElasticsearchNodeRole>>,
}

#[derive(Clone, Debug, Default)]
pub struct NodeState {
    pub actual: ActualState,
    pub desired: DesiredState,
}

/// Public status record for one node.
pub fn project(node: &NodeState) -> ElasticsearchNodeStatus {
    let actual = &node.actual;
    ElasticsearchNodeStatus {
        deployment_name: actual.deployment.as_ref().map(|d| d.name_any()),
        replica_set_name: actual.replica_set.as_ref().map(|r| r.name_any()),
        stateful_set_name: actual.stateful_set.as_ref().map(|s| s.name_any()),
        pod_name: actual.pod.as_ref().map(|p| p.name_any()),
        status: actual
            .pod
            .as_ref()
            .and_then(|p| pod_phase(p))
            .map(str::to_string),
        roles: node.desired.roles.clone(),
    }
}
