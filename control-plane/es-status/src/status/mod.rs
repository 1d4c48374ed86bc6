//! Per-cycle status computation and commit for `Elasticsearch` resources.

pub mod aggregate;
pub mod health;
pub mod node;
pub mod reconciler;

pub use aggregate::{PodRoleAggregator, pod_state_map};
pub use health::{ClusterHealthProbe, HEALTH_UNKNOWN};
pub use node::{ActualState, DesiredState, NodeState, project};
pub use reconciler::{RetryPolicy, StatusReconciler};
