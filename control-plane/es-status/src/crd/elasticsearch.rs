use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema,
)]
#[kube(
    group = "logging.openshift.io",
    version = "v1alpha1",
    kind = "Elasticsearch",
    plural = "elasticsearches",
    namespaced,
    status = "ElasticsearchStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchSpec {
    /// Node groups making up the cluster
    #[serde(default)]
    pub nodes: Vec<ElasticsearchNode>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchNode {
    #[serde(default)]
    pub roles: Vec<ElasticsearchNodeRole>,
    #[serde(default)]
    pub node_count: i32,
}

#[derive(
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Debug,
    JsonSchema,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum ElasticsearchNodeRole {
    Client,
    Data,
    Master,
}

impl ElasticsearchNodeRole {
    pub const ALL: [ElasticsearchNodeRole; 3] = [
        ElasticsearchNodeRole::Client,
        ElasticsearchNodeRole::Data,
        ElasticsearchNodeRole::Master,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElasticsearchNodeRole::Client => "client",
            ElasticsearchNodeRole::Data => "data",
            ElasticsearchNodeRole::Master => "master",
        }
    }

    /// Pod/workload label key marking membership in this role, e.g.
    /// `es-node-data`. The label value is always `"true"`.
    pub fn label_key(&self) -> String {
        format!("es-node-{}", self.as_str())
    }
}

impl std::fmt::Display for ElasticsearchNodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status sub-document. Rebuilt from scratch on every reconcile and written
/// over the previous value as a whole.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchStatus {
    #[serde(default)]
    pub cluster_health: String,
    #[serde(default)]
    pub nodes: Vec<ElasticsearchNodeStatus>,
    #[serde(default)]
    #[schemars(with = "BTreeMap<String, PodStateMap>")]
    pub pods: BTreeMap<ElasticsearchNodeRole, PodStateMap>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchNodeStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_set_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stateful_set_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    /// Pod phase, e.g. `Running`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<ElasticsearchNodeRole>>,
}

/// Pod names of one role, bucketed by readiness. All three lists are always
/// serialized, even when empty.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodStateMap {
    #[serde(default)]
    pub ready: Vec<String>,
    #[serde(default)]
    pub not_ready: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
}
