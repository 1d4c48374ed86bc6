use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::trace;

use crate::crd::Elasticsearch;

/// Identity of an `Elasticsearch` resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterRef {
    pub namespace: String,
    pub name: String,
}

impl ClusterRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_resource(es: &Elasticsearch) -> Self {
        Self::new(
            es.namespace().unwrap_or_else(|| "default".to_string()),
            es.name_any(),
        )
    }
}

impl std::fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The resource version changed between read and write.
    #[error("version conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("Kubernetes API error: {0}")]
    Kube(kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ae) if ae.code == 409 => {
                StoreError::Conflict(ae.message.clone())
            }
            kube::Error::Api(ae) if ae.code == 404 => {
                StoreError::NotFound(ae.message.clone())
            }
            other => StoreError::Kube(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Versioned document store holding `Elasticsearch` resources.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Read the latest version of the resource.
    async fn get(&self, cluster: &ClusterRef) -> StoreResult<Elasticsearch>;

    /// Write `es.status` back. Must fail with [`StoreError::Conflict`] when
    /// the stored version no longer matches `es.metadata.resourceVersion`.
    async fn update_status(&self, es: &Elasticsearch) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, ns: &str) -> Api<Elasticsearch> {
        Api::namespaced(self.client.clone(), ns)
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn get(&self, cluster: &ClusterRef) -> StoreResult<Elasticsearch> {
        Ok(self.api(&cluster.namespace).get(&cluster.name).await?)
    }

    async fn update_status(&self, es: &Elasticsearch) -> StoreResult<()> {
        let cluster = ClusterRef::from_resource(es);
        // resourceVersion in the patch body turns it into a compare-and-swap;
        // the apiserver answers 409 when it is stale.
        let patch = json!({
            "metadata": { "resourceVersion": es.resource_version() },
            "status": serde_json::to_value(&es.status)?,
        });
        trace!(%cluster, "store: patching status");
        self.api(&cluster.namespace)
            .patch_status(
                &cluster.name,
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ElasticsearchSpec;

    #[test]
    fn cluster_ref_defaults_namespace() {
        let es = Elasticsearch::new("elasticsearch", ElasticsearchSpec::default());
        let r = ClusterRef::from_resource(&es);
        assert_eq!(r.to_string(), "default/elasticsearch");
    }

    #[test]
    fn only_conflict_is_conflict() {
        assert!(StoreError::Conflict("x".into()).is_conflict());
        assert!(!StoreError::NotFound("x".into()).is_conflict());
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".into(),
            message: format!("{reason} from apiserver"),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn apiserver_codes_map_to_store_errors() {
        let conflict = StoreError::from(api_error(409, "Conflict"));
        assert!(conflict.is_conflict());
        assert!(matches!(conflict, StoreError::Conflict(m) if m == "Conflict from apiserver"));

        assert!(matches!(
            StoreError::from(api_error(404, "NotFound")),
            StoreError::NotFound(_)
        ));

        let other = StoreError::from(api_error(500, "InternalError"));
        assert!(!other.is_conflict());
        assert!(matches!(other, StoreError::Kube(kube::Error::Api(ae)) if ae.code == 500));
    }
}
