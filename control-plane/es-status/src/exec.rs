//! Remote command execution inside cluster pods.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// How the executor reaches the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialMode {
    /// Service account of the pod we run in, default endpoint.
    InCluster,
    /// Explicit kubeconfig file talking to `endpoint`.
    External {
        kubeconfig_path: String,
        endpoint: String,
    },
}

impl CredentialMode {
    /// Builds a mode from the optional path/endpoint pair. Both must be empty
    /// or both populated.
    pub fn from_parts(
        kubeconfig_path: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<Self> {
        let path = kubeconfig_path.filter(|s| !s.is_empty());
        let endpoint = endpoint.filter(|s| !s.is_empty());
        match (path, endpoint) {
            (None, None) => Ok(CredentialMode::InCluster),
            (Some(p), Some(e)) => Ok(CredentialMode::External {
                kubeconfig_path: p.to_string(),
                endpoint: e.to_string(),
            }),
            (Some(_), None) => Err(Error::Config(
                "kubeconfig path is set but the API endpoint is empty".into(),
            )),
            (None, Some(_)) => Err(Error::Config(
                "API endpoint is set but the kubeconfig path is empty".into(),
            )),
        }
    }

    pub async fn client(&self) -> Result<Client> {
        let config = match self {
            CredentialMode::InCluster => Config::incluster()
                .map_err(|e| Error::Exec(format!("in-cluster config: {e}")))?,
            CredentialMode::External {
                kubeconfig_path,
                endpoint,
            } => {
                let kubeconfig = Kubeconfig::read_from(kubeconfig_path)
                    .map_err(|e| {
                        Error::Exec(format!("read {kubeconfig_path}: {e}"))
                    })?;
                let mut config = Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions::default(),
                )
                .await
                .map_err(|e| Error::Exec(format!("kubeconfig: {e}")))?;
                config.cluster_url =
                    endpoint.parse::<http::Uri>().map_err(|e| {
                        Error::Exec(format!("endpoint {endpoint}: {e}"))
                    })?;
                config
            }
        };
        Ok(Client::try_from(config)?)
    }
}

/// Runs a command in a container of a pod and returns its standard output.
#[async_trait]
pub trait PodExecutor: Send + Sync {
    async fn exec(
        &self,
        pod: &Pod,
        container: &str,
        command: &[String],
    ) -> Result<String>;
}

/// Executes through the API server's exec subresource. The client is built
/// from `mode` on first use and shared by every later exec.
pub struct KubePodExecutor {
    mode: CredentialMode,
    client: OnceCell<Client>,
}

impl KubePodExecutor {
    pub fn new(mode: CredentialMode) -> Self {
        Self {
            mode,
            client: OnceCell::new(),
        }
    }

    /// Resolved client. A failed resolution is not cached.
    pub async fn client(&self) -> Result<Client> {
        let client = self
            .client
            .get_or_try_init(|| self.mode.client())
            .await?;
        Ok(client.clone())
    }
}

#[async_trait]
impl PodExecutor for KubePodExecutor {
    #[instrument(level = "debug", skip(self, pod), fields(pod = %pod.name_any()))]
    async fn exec(
        &self,
        pod: &Pod,
        container: &str,
        command: &[String],
    ) -> Result<String> {
        let ns = pod.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<Pod> = Api::namespaced(self.client().await?, &ns);
        let ap = AttachParams::default()
            .container(container)
            .stdin(false)
            .stdout(true)
            .stderr(false)
            .tty(false);
        let mut attached = api.exec(&pod.name_any(), command.to_vec(), &ap).await?;
        let mut stdout = attached
            .stdout()
            .ok_or_else(|| Error::Exec("stdout not attached".into()))?;
        let mut buf = Vec::new();
        stdout
            .read_to_end(&mut buf)
            .await
            .map_err(|e| Error::Exec(format!("read stdout: {e}")))?;
        attached
            .join()
            .await
            .map_err(|e| Error::Exec(e.to_string()))?;
        debug!(bytes = buf.len(), "exec: captured stdout");
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
