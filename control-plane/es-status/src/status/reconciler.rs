use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::aggregate::PodRoleAggregator;
use super::health::ClusterHealthProbe;
use super::node::{NodeState, project};
use crate::crd::ElasticsearchStatus;
use crate::error::{Error, Result};
use crate::store::{ClusterRef, ClusterStore};

/// Bounds the refetch-recompute-recommit loop on version conflicts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Fraction of `delay` added at random to each wait.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(10),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt. A jitter that is not a finite positive
    /// number, or one that overflows the wait, yields the bare `delay`.
    pub fn backoff(&self) -> Duration {
        if !(self.jitter.is_finite() && self.jitter > 0.0) || self.delay.is_zero()
        {
            return self.delay;
        }
        let extra = rand::rng().random::<f64>() * self.jitter;
        Duration::try_from_secs_f64(self.delay.as_secs_f64() * extra)
            .ok()
            .and_then(|d| self.delay.checked_add(d))
            .unwrap_or(self.delay)
    }
}

pub struct StatusReconciler {
    store: Arc<dyn ClusterStore>,
    health: ClusterHealthProbe,
    pods: PodRoleAggregator,
    retry: RetryPolicy,
}

impl StatusReconciler {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        health: ClusterHealthProbe,
        pods: PodRoleAggregator,
    ) -> Self {
        Self {
            store,
            health,
            pods,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Status as observed right now. Nothing from the previous status is
    /// carried over.
    pub async fn compute_status(
        &self,
        cluster: &ClusterRef,
        nodes: &[NodeState],
    ) -> ElasticsearchStatus {
        ElasticsearchStatus {
            cluster_health: self
                .health
                .health(&cluster.name, &cluster.namespace)
                .await,
            nodes: nodes.iter().map(project).collect(),
            pods: self.pods.aggregate(&cluster.namespace, &cluster.name).await,
        }
    }

    /// Fetch, recompute and overwrite the status of `cluster`, starting over
    /// whenever the write loses a version race.
    #[instrument(skip_all, fields(cluster = %cluster, nodes = nodes.len()))]
    pub async fn update_status(
        &self,
        cluster: &ClusterRef,
        nodes: &[NodeState],
    ) -> Result<()> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut es = self.store.get(cluster).await.map_err(|source| {
                debug!(error = %source, "could not get Elasticsearch");
                Error::Fetch {
                    cluster: cluster.clone(),
                    source,
                }
            })?;

            es.status = Some(self.compute_status(cluster, nodes).await);

            match self.store.update_status(&es).await {
                Ok(()) => {
                    debug!(attempts, "updated Elasticsearch status");
                    return Ok(());
                }
                Err(source) if source.is_conflict() => {
                    if attempts >= max_attempts {
                        return Err(Error::RetriesExhausted {
                            cluster: cluster.clone(),
                            attempts,
                            source,
                        });
                    }
                    debug!(attempts, error = %source, "status update conflicted; retrying");
                    tokio::time::sleep(self.retry.backoff()).await;
                }
                Err(source) => {
                    debug!(error = %source, "failed to update Elasticsearch status");
                    return Err(Error::Commit {
                        cluster: cluster.clone(),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_client_default_retry() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.delay, Duration::from_millis(10));
    }

    #[test]
    fn backoff_stays_within_jitter() {
        let p = RetryPolicy::default();
        for _ in 0..100 {
            let d = p.backoff();
            assert!(d >= Duration::from_millis(10));
            assert!(d <= Duration::from_millis(11));
        }
    }

    #[test]
    fn zero_jitter_is_fixed() {
        let p = RetryPolicy {
            jitter: 0.0,
            ..Default::default()
        };
        assert_eq!(p.backoff(), p.delay);
    }

    #[test]
    fn unusable_jitter_falls_back_to_delay() {
        for jitter in [f64::NAN, f64::INFINITY, -0.5] {
            let p = RetryPolicy {
                jitter,
                ..Default::default()
            };
            assert_eq!(p.backoff(), p.delay, "jitter {jitter}");
        }
        let p = RetryPolicy {
            jitter: 1e300,
            ..Default::default()
        };
        // either the overflow fallback or a huge but valid wait; never a panic
        assert!(p.backoff() >= p.delay);
    }
}
