use std::sync::Arc;

use kube::ResourceExt;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::exec::PodExecutor;
use crate::pods::PodLister;

/// Reported when health cannot be obtained from a running cluster.
pub const HEALTH_UNKNOWN: &str = "unknown";

pub const ES_CONTAINER: &str = "elasticsearch";

pub fn health_command() -> Vec<String> {
    vec![
        "es_util".to_string(),
        "--query=_cluster/health?pretty=true".to_string(),
    ]
}

/// Asks one running pod of the cluster for `_cluster/health`.
///
/// Never fails: an empty string means no pod is running yet, and
/// [`HEALTH_UNKNOWN`] covers every listing, transport or parse failure.
#[derive(Clone)]
pub struct ClusterHealthProbe {
    pods: Arc<dyn PodLister>,
    executor: Arc<dyn PodExecutor>,
    container: String,
}

impl ClusterHealthProbe {
    pub fn new(pods: Arc<dyn PodLister>, executor: Arc<dyn PodExecutor>) -> Self {
        Self {
            pods,
            executor,
            container: ES_CONTAINER.to_string(),
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn health(&self, name: &str, namespace: &str) -> String {
        let pods = match self.pods.list_running(namespace, name).await {
            Ok(pods) => pods,
            Err(e) => {
                debug!(error = %e, "health: could not list running pods");
                return HEALTH_UNKNOWN.to_string();
            }
        };

        let Some(pod) = pods.first() else {
            trace!("health: no running pods");
            return String::new();
        };

        let out = match self
            .executor
            .exec(pod, &self.container, &health_command())
            .await
        {
            Ok(out) => out,
            Err(e) => {
                debug!(pod = %pod.name_any(), error = %e, "health: exec failed");
                return HEALTH_UNKNOWN.to_string();
            }
        };

        parse_health(&out).unwrap_or_else(|| HEALTH_UNKNOWN.to_string())
    }
}

/// Extracts the string `status` field from a health API response.
pub fn parse_health(output: &str) -> Option<String> {
    let doc: Map<String, Value> = match serde_json::from_str(output) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "health: could not unmarshal response");
            return None;
        }
    };
    match doc.get("status") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            debug!(status = %other, "health: 'status' is not a string");
            None
        }
        None => {
            debug!("health: response did not contain 'status' field");
            None
        }
    }
}
