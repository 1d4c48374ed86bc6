//! Error types for the status subsystem.

use crate::store::{ClusterRef, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cluster resource could not be read; never retried.
    #[error("could not get Elasticsearch {cluster}: {source}")]
    Fetch {
        cluster: ClusterRef,
        #[source]
        source: StoreError,
    },

    /// A non-conflict failure while writing status; never retried.
    #[error("failed to update Elasticsearch {cluster} status: {source}")]
    Commit {
        cluster: ClusterRef,
        #[source]
        source: StoreError,
    },

    #[error(
        "could not update status for Elasticsearch {cluster} after {attempts} attempts: {source}"
    )]
    RetriesExhausted {
        cluster: ClusterRef,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("remote command failed: {0}")]
    Exec(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Errors the controller should requeue sooner for.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::Fetch { .. }
                | Error::RetriesExhausted { .. }
                | Error::Kube(_)
        )
    }
}
