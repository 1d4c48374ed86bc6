use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, ObjectMeta};
use kube::{Client, Resource, ResourceExt};

use crate::crd::ElasticsearchNodeRole;
use crate::pods::cluster_label_selector;
use crate::status::{ActualState, DesiredState, NodeState};

const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

/// Workloads of one cluster as listed from the API server.
#[derive(Clone, Debug, Default)]
pub struct ObservedWorkloads {
    pub deployments: Vec<Deployment>,
    pub replica_sets: Vec<ReplicaSet>,
    pub stateful_sets: Vec<StatefulSet>,
    pub pods: Vec<Pod>,
}

/// List the cluster's workloads by the cluster label. This is a best-effort
/// view; a kind whose listing fails is simply left empty.
#[tracing::instrument(level = "debug", skip(client))]
pub async fn observe_workloads(
    client: Client,
    ns: &str,
    cluster_name: &str,
) -> ObservedWorkloads {
    let lp = ListParams::default().labels(&cluster_label_selector(cluster_name));
    ObservedWorkloads {
        deployments: list_or_empty::<Deployment>(&client, ns, &lp).await,
        replica_sets: list_or_empty::<ReplicaSet>(&client, ns, &lp).await,
        stateful_sets: list_or_empty::<StatefulSet>(&client, ns, &lp).await,
        pods: list_or_empty::<Pod>(&client, ns, &lp).await,
    }
}

async fn list_or_empty<K>(client: &Client, ns: &str, lp: &ListParams) -> Vec<K>
where
    K: Resource<Scope = NamespaceResourceScope>
        + Clone
        + serde::de::DeserializeOwned
        + std::fmt::Debug,
    <K as Resource>::DynamicType: Default,
{
    let api: Api<K> = Api::namespaced(client.clone(), ns);
    match api.list(lp).await {
        Ok(list) => list.items,
        Err(e) => {
            tracing::debug!(error = %e, "observe: listing failed");
            Vec::new()
        }
    }
}

/// One node per Deployment and per StatefulSet, sorted by workload name.
/// Deployments resolve to their newest ReplicaSet and that set's first pod;
/// StatefulSets to their first pod. Roles come from `es-node-<role>=true`
/// labels on the workload.
pub fn build_nodes(observed: &ObservedWorkloads) -> Vec<NodeState> {
    let mut nodes: Vec<(String, NodeState)> = Vec::new();

    for dep in &observed.deployments {
        let replica_set = observed
            .replica_sets
            .iter()
            .filter(|rs| owned_by(&rs.metadata, dep.uid().as_deref()))
            .max_by_key(|rs| revision(&rs.metadata))
            .cloned();
        let pod = replica_set.as_ref().and_then(|rs| {
            first_owned_pod(&observed.pods, rs.uid().as_deref())
        });
        nodes.push((
            dep.name_any(),
            NodeState {
                actual: ActualState {
                    deployment: Some(dep.clone()),
                    replica_set,
                    stateful_set: None,
                    pod,
                },
                desired: desired_from(&dep.metadata),
            },
        ));
    }

    for sts in &observed.stateful_sets {
        nodes.push((
            sts.name_any(),
            NodeState {
                actual: ActualState {
                    deployment: None,
                    replica_set: None,
                    stateful_set: Some(sts.clone()),
                    pod: first_owned_pod(&observed.pods, sts.uid().as_deref()),
                },
                desired: desired_from(&sts.metadata),
            },
        ));
    }

    nodes.sort_by(|a, b| a.0.cmp(&b.0));
    nodes.into_iter().map(|(_, n)| n).collect()
}

fn owned_by(meta: &ObjectMeta, owner_uid: Option<&str>) -> bool {
    let Some(uid) = owner_uid else {
        return false;
    };
    meta.owner_references
        .as_ref()
        .map(|refs| refs.iter().any(|r| r.uid == uid))
        .unwrap_or(false)
}

fn first_owned_pod(pods: &[Pod], owner_uid: Option<&str>) -> Option<Pod> {
    let mut owned: Vec<&Pod> = pods
        .iter()
        .filter(|p| owned_by(&p.metadata, owner_uid))
        .collect();
    owned.sort_by_key(|p| p.name_any());
    owned.first().map(|p| (*p).clone())
}

fn revision(meta: &ObjectMeta) -> u64 {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(REVISION_ANNOTATION))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn desired_from(meta: &ObjectMeta) -> DesiredState {
    let Some(labels) = meta.labels.as_ref() else {
        return DesiredState::default();
    };
    let roles: Vec<ElasticsearchNodeRole> = ElasticsearchNodeRole::ALL
        .into_iter()
        .filter(|r| labels.get(&r.label_key()).map(String::as_str) == Some("true"))
        .collect();
    DesiredState {
        roles: (!roles.is_empty()).then_some(roles),
    }
}
