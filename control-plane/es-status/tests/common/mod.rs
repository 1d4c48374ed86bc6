#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use es_status::crd::{Elasticsearch, ElasticsearchSpec, ElasticsearchStatus};
use es_status::exec::PodExecutor;
use es_status::pods::PodLister;
use es_status::status::{
    ClusterHealthProbe, PodRoleAggregator, RetryPolicy, StatusReconciler,
};
use es_status::store::{ClusterRef, ClusterStore, StoreError, StoreResult};
use es_status::{Error, Result};
use k8s_openapi::api::core::v1::{ContainerStatus, Pod, PodStatus};
use kube::ResourceExt;
use kube::api::ObjectMeta;
use tokio::sync::Mutex;

pub const NS: &str = "openshift-logging";
pub const CLUSTER: &str = "elasticsearch";

pub fn cluster_ref() -> ClusterRef {
    ClusterRef::new(NS, CLUSTER)
}

pub fn pod(name: &str, phase: &str, ready: &[bool]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(NS.into()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.into()),
            container_statuses: Some(
                ready
                    .iter()
                    .enumerate()
                    .map(|(i, r)| ContainerStatus {
                        name: format!("c{i}"),
                        ready: *r,
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Pods keyed by exact label selector. Selectors in `failing` return an
/// API error; unknown selectors return an empty list.
#[derive(Default)]
pub struct FakePodLister {
    pods: HashMap<String, Vec<Pod>>,
    failing: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakePodLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pods(mut self, selector: &str, pods: Vec<Pod>) -> Self {
        self.pods.insert(selector.to_string(), pods);
        self
    }

    pub fn failing(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }
}

#[async_trait]
impl PodLister for FakePodLister {
    async fn list(&self, _namespace: &str, selector: &str) -> Result<Vec<Pod>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(selector) {
            return Err(Error::Exec(format!("list {selector}: connection refused")));
        }
        Ok(self.pods.get(selector).cloned().unwrap_or_default())
    }
}

/// Returns a fixed stdout, or fails as a transport error when `None`.
pub struct FakeExecutor {
    output: Option<String>,
    pub calls: AtomicUsize,
    pub last_pod: std::sync::Mutex<Option<String>>,
}

impl FakeExecutor {
    pub fn returning(output: &str) -> Self {
        Self {
            output: Some(output.to_string()),
            calls: AtomicUsize::new(0),
            last_pod: std::sync::Mutex::new(None),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            output: None,
            calls: AtomicUsize::new(0),
            last_pod: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl PodExecutor for FakeExecutor {
    async fn exec(
        &self,
        pod: &Pod,
        container: &str,
        command: &[String],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(container, "elasticsearch");
        assert_eq!(command[0], "es_util");
        *self.last_pod.lock().unwrap() = Some(pod.name_any());
        self.output
            .clone()
            .ok_or_else(|| Error::Exec("dial tcp: i/o timeout".into()))
    }
}

struct StoreState {
    es: Elasticsearch,
    version: u64,
    conflicts_left: usize,
    commits: Vec<String>,
}

/// Versioned single-document store. `conflicts` simulates concurrent
/// writers winning that many commits in a row.
pub struct FakeStore {
    state: Mutex<StoreState>,
    fail_get: bool,
    fail_update: bool,
    pub gets: AtomicUsize,
    pub updates: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        let mut es = Elasticsearch::new(CLUSTER, ElasticsearchSpec::default());
        es.metadata.namespace = Some(NS.into());
        es.metadata.resource_version = Some("1".into());
        Self {
            state: Mutex::new(StoreState {
                es,
                version: 1,
                conflicts_left: 0,
                commits: Vec::new(),
            }),
            fail_get: false,
            fail_update: false,
            gets: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn with_status(self, status: ElasticsearchStatus) -> Self {
        self.state.try_lock().unwrap().es.status = Some(status);
        self
    }

    pub fn with_conflicts(self, n: usize) -> Self {
        self.state.try_lock().unwrap().conflicts_left = n;
        self
    }

    pub fn failing_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub async fn status(&self) -> Option<ElasticsearchStatus> {
        self.state.lock().await.es.status.clone()
    }

    /// Serialized status documents of every successful commit.
    pub async fn commits(&self) -> Vec<String> {
        self.state.lock().await.commits.clone()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn get(&self, cluster: &ClusterRef) -> StoreResult<Elasticsearch> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get {
            return Err(StoreError::NotFound(cluster.to_string()));
        }
        Ok(self.state.lock().await.es.clone())
    }

    async fn update_status(&self, es: &Elasticsearch) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update {
            return Err(StoreError::NotFound(es.name_any()));
        }
        let mut state = self.state.lock().await;
        if state.conflicts_left > 0 {
            // another writer got in first
            state.conflicts_left -= 1;
            state.version += 1;
            state.es.metadata.resource_version = Some(state.version.to_string());
        }
        if es.resource_version() != state.es.resource_version() {
            return Err(StoreError::Conflict(format!(
                "the object has been modified; stored version is {}",
                state.version
            )));
        }
        state.version += 1;
        state.es.status = es.status.clone();
        state.es.metadata.resource_version = Some(state.version.to_string());
        let doc = serde_json::to_string(&es.status)?;
        state.commits.push(doc);
        Ok(())
    }
}

pub fn no_wait_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay: std::time::Duration::ZERO,
        jitter: 0.0,
    }
}

pub fn reconciler(
    store: Arc<FakeStore>,
    pods: Arc<FakePodLister>,
    exec: Arc<FakeExecutor>,
) -> StatusReconciler {
    StatusReconciler::new(
        store,
        ClusterHealthProbe::new(pods.clone(), exec),
        PodRoleAggregator::new(pods),
    )
}
