pub mod elasticsearch;

pub use elasticsearch::{
    Elasticsearch, ElasticsearchNode, ElasticsearchNodeRole,
    ElasticsearchNodeStatus, ElasticsearchSpec, ElasticsearchStatus,
    PodStateMap,
};
