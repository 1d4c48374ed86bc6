use std::time::Duration;

use envconfig::Envconfig;

use crate::error::{Error, Result};
use crate::exec::CredentialMode;
use crate::status::RetryPolicy;

#[derive(Envconfig, Clone, Debug)]
pub struct StatusConfig {
    /// Restrict the controller to one namespace; all namespaces when unset.
    /// Env: ES_STATUS_WATCH_NAMESPACE
    #[envconfig(from = "ES_STATUS_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Kubeconfig used for the health exec. Empty means in-cluster
    /// credentials. Mostly useful when running outside the cluster in tests.
    #[envconfig(from = "KUBERNETES_CONFIG")]
    pub kubeconfig_path: Option<String>,

    /// API endpoint paired with `KUBERNETES_CONFIG`; ignored in-cluster.
    #[envconfig(
        from = "ES_STATUS_MASTER_URL",
        default = "https://kubernetes.default.svc"
    )]
    pub master_url: String,

    #[envconfig(from = "ES_STATUS_HEALTH_CONTAINER", default = "elasticsearch")]
    pub health_container: String,

    /// Interval between status refreshes of a healthy resource.
    #[envconfig(from = "ES_STATUS_REQUEUE_SECS", default = "30")]
    pub requeue_secs: u64,

    #[envconfig(nested)]
    pub retry: RetryConfig,
}

#[derive(Envconfig, Clone, Debug)]
pub struct RetryConfig {
    #[envconfig(from = "ES_STATUS_RETRY_MAX_ATTEMPTS", default = "5")]
    pub max_attempts: u32,
    #[envconfig(from = "ES_STATUS_RETRY_DELAY_MS", default = "10")]
    pub delay_ms: u64,
    #[envconfig(from = "ES_STATUS_RETRY_JITTER", default = "0.1")]
    pub jitter: f64,
}

impl StatusConfig {
    /// Resolve the exec credentials. Without a kubeconfig path the endpoint
    /// is dropped and in-cluster credentials are used.
    pub fn credential_mode(&self) -> Result<CredentialMode> {
        let path = self.kubeconfig_path.as_deref().filter(|p| !p.is_empty());
        let endpoint = path.map(|_| self.master_url.as_str());
        CredentialMode::from_parts(path, endpoint)
    }

    /// Jitter must be a fraction in `[0, 1]`.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let jitter = self.retry.jitter;
        if !(jitter.is_finite() && (0.0..=1.0).contains(&jitter)) {
            return Err(Error::Config(format!(
                "ES_STATUS_RETRY_JITTER must be within [0, 1], got {jitter}"
            )));
        }
        Ok(RetryPolicy {
            max_attempts: self.retry.max_attempts,
            delay: Duration::from_millis(self.retry.delay_ms),
            jitter,
        })
    }

    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }
}
