use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use nmos_node::{
    serve_metrics, ActivationHandler, Config, HostInterfaces, NodeService, PrometheusReporter,
    StaticInterfaces, SystemInterfaces,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    if config.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    info!("Starting nmos-node v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    info!("Configuration validated");

    PrometheusReporter::init_metrics()?;
    info!("Metrics initialized");

    let settings = config.to_node_settings(&config.seed())?;
    let connection_api = settings.connection_api_base();

    let configured = config.host_interfaces()?;
    let host: Arc<dyn HostInterfaces> = if configured.is_empty() {
        Arc::new(SystemInterfaces::new())
    } else {
        Arc::new(StaticInterfaces::new(configured))
    };

    // Media pipelines are driven elsewhere; log what they would be told
    let handler: Arc<dyn ActivationHandler> = Arc::new(|internal_id: &str, sdp: Option<&str>| match sdp {
        Some(sdp) => info!(internal_id = %internal_id, "Activated:\n{}", sdp),
        None => info!(internal_id = %internal_id, "Deactivated"),
    });

    let service = Arc::new(NodeService::new(
        settings,
        host,
        handler,
        Arc::new(PrometheusReporter::new()),
    ));

    service
        .init(&config.read_sender_sdps()?, &config.read_receiver_sdps()?)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let metrics_port = config.metrics_port;
    let metrics_service = service.clone();
    tokio::spawn(async move {
        serve_metrics(metrics_port, metrics_service).await;
    });
    info!("Metrics server started on port {}", config.metrics_port);

    info!("-------------------------------------------------------");
    info!("NMOS Node Ready");
    info!("   Connection API: {}", connection_api);
    info!("   Resources: {}", service.snapshot().await.resources.len());
    info!("   Metrics:   http://0.0.0.0:{}/metrics", config.metrics_port);
    info!("   Graph:     http://0.0.0.0:{}/resources", config.metrics_port);
    info!("-------------------------------------------------------");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received (Ctrl+C)"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }

    info!("Node stopped gracefully");
    Ok(())
}
