use envconfig::Envconfig;
use es_status::{config::StatusConfig, controller, init_tracing};
use kube::Client;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    // Ensure rustls uses the aws-lc-rs provider explicitly.
    if let Err(e) = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::aws_lc_rs::default_provider(),
    ) {
        tracing::debug!(
            ?e,
            "CryptoProvider already installed or incompatible; proceeding"
        );
    }

    let cfg = StatusConfig::init_from_env()?;
    info!(?cfg, "Starting Elasticsearch status controller");

    let client = Client::try_default().await?;
    controller::run_controller(client, cfg).await
}
